use crate::types::HashBytes;

/// Hash of the blank state leaf which occupies index 0 of every state tree.
/// 6769006970205099520508948723718471724660867171122235270773600567925038008762
pub const BLANK_STATE_LEAF_HASH: HashBytes = [
    0x0e, 0xf7, 0x1f, 0x46, 0xe1, 0x1a, 0x51, 0x3c, 0x59, 0x9e, 0xed, 0x9d, 0xd0, 0x35, 0x76, 0xc3,
    0x34, 0x39, 0xbc, 0xfb, 0x1c, 0xee, 0x15, 0x53, 0x16, 0xf9, 0x05, 0x41, 0xe4, 0x16, 0x49, 0xba
];

/// keccak256("Maci") reduced into the scalar field; the zero leaf of message trees.
/// 8370432830353022751713833565135785980866757267633941821328460903436894336785
pub const NOTHING_UP_MY_SLEEVE: HashBytes = [
    0x12, 0x81, 0x7f, 0x41, 0x61, 0xf2, 0xf5, 0xde, 0xd3, 0x3f, 0x26, 0xc5, 0x57, 0x35, 0xa7, 0x7e,
    0x80, 0xe4, 0xf8, 0x97, 0x54, 0x83, 0xc8, 0xc2, 0x70, 0x47, 0x45, 0x12, 0x84, 0x17, 0xf7, 0x11
];

/// x-coordinate of the padding key held by the blank state leaf.
pub const PAD_KEY_X: HashBytes = [
    0x17, 0x1e, 0x82, 0x6a, 0xd4, 0xa8, 0x70, 0xfd, 0x92, 0x5e, 0x0b, 0xf0, 0xe8, 0x78, 0x84, 0xe7,
    0x0e, 0x08, 0x08, 0x79, 0xc2, 0x20, 0x5e, 0xf1, 0x01, 0x14, 0xf2, 0x8a, 0x3b, 0x6f, 0x6d, 0xd7
];

/// y-coordinate of the padding key held by the blank state leaf.
pub const PAD_KEY_Y: HashBytes = [
    0x2b, 0xd4, 0x07, 0xd8, 0x97, 0xfb, 0xbc, 0xa9, 0xf8, 0x8a, 0xdf, 0xd2, 0xd1, 0x52, 0x52, 0xe6,
    0x9d, 0xe8, 0xc1, 0x56, 0x4e, 0xb4, 0xd3, 0xd2, 0x71, 0x62, 0xe2, 0x59, 0x17, 0x2f, 0x1a, 0x1d
];
