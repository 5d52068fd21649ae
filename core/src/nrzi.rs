//! NRZI line coding
//!
//! A 0 bit is sent as a change of level, a 1 bit as no change. Both
//! directions start from the high level.

pub fn encode_nrzi(bits: &[bool]) -> Vec<bool> {
    let mut level = true;
    bits.iter()
        .map(|&bit| {
            if !bit {
                level = !level;
            }
            level
        })
        .collect()
}

pub fn decode_nrzi(levels: &[bool]) -> Vec<bool> {
    let mut previous = true;
    levels
        .iter()
        .map(|&level| {
            let bit = level == previous;
            previous = level;
            bit
        })
        .collect()
}
