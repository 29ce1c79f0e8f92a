//! Mnemonic names for well-known `(record type, tag)` pairs.
//!
//! NIST-ITL assigns every field a bare field number, but most fields
//! also have a conventional mnemonic (`LEN`, `IDC`, `HLL`...) defined by
//! the standard for a given record type. These tables let callers look
//! a field up by either name.

type Entry = (u16, &'static str);

const TYPE_1: &[Entry] = &[
    (1, "LEN"),
    (2, "VER"),
    (3, "CNT"),
    (4, "TOT"),
    (5, "DAT"),
    (6, "PRY"),
    (7, "DAI"),
    (8, "ORI"),
    (9, "TCN"),
    (10, "TCR"),
    (11, "NSR"),
    (12, "NTR"),
    (13, "DOM"),
    (14, "GMT"),
    (15, "DCS"),
];

const LEN_IDC_ONLY: &[Entry] = &[(1, "LEN"), (2, "IDC")];

const TYPE_10: &[Entry] = &[
    (1, "LEN"),
    (2, "IDC"),
    (3, "IMT"),
    (4, "SRC"),
    (5, "PHD"),
    (6, "HLL"),
    (7, "VLL"),
    (8, "SLC"),
    (9, "THPS"),
    (10, "TVPS"),
    (11, "CGA"),
    (12, "CSP"),
    (13, "SAP"),
    (14, "FIP"),
    (15, "FPFI"),
    (16, "SHPS"),
    (17, "SVPS"),
    (18, "DIST"),
    (19, "LAF"),
    (20, "POS"),
    (21, "POA"),
    (23, "PAS"),
    (24, "SQS"),
    (25, "SPA"),
    (26, "SXS"),
    (27, "SEC"),
    (28, "SHC"),
    (29, "FFP"),
    (30, "DMM"),
    (31, "TMC"),
    (32, "3DF"),
    (33, "FEC"),
    (34, "ICDR"),
    (38, "COM"),
    (39, "T10"),
    (40, "SMT"),
    (41, "SMS"),
    (42, "SMD"),
    (43, "COL"),
    (44, "ITX"),
    (45, "OCC"),
    (46, "SUB"),
    (47, "CON"),
    (48, "PID"),
    (49, "CID"),
    (50, "VID"),
    (51, "RSP"),
    (902, "ANN"),
    (903, "DUI"),
    (904, "MMS"),
    (992, "T2C"),
    (993, "SAN"),
    (994, "EFR"),
    (995, "ASC"),
    (996, "HAS"),
    (997, "SOR"),
    (998, "GEO"),
    (999, "DATA"),
];

const TYPE_13: &[Entry] = &[
    (1, "LEN"),
    (2, "IDC"),
    (3, "IMP"),
    (4, "SRC"),
    (5, "LCD"),
    (6, "HLL"),
    (7, "VLL"),
    (8, "SLC"),
    (9, "THPS"),
    (10, "TVPS"),
    (11, "CGA"),
    (12, "BPX"),
    (13, "FGP"),
    (14, "SPD"),
    (15, "PPC"),
    (16, "SHPS"),
    (17, "SVPS"),
    (18, "RSP"),
    (19, "REM"),
    (20, "COM"),
    (24, "LQM"),
    (46, "SUB"),
    (47, "CON"),
    (901, "FCT"),
    (902, "ANN"),
    (903, "DUI"),
    (904, "MMS"),
    (992, "T2C"),
    (993, "SAN"),
    (994, "EFR"),
    (995, "ASC"),
    (996, "HAS"),
    (997, "SOR"),
    (998, "GEO"),
    (999, "DATA"),
];

const TYPE_14: &[Entry] = &[
    (1, "LEN"),
    (2, "IDC"),
    (3, "IMP"),
    (4, "SRC"),
    (5, "FCD"),
    (6, "HLL"),
    (7, "VLL"),
    (8, "SLC"),
    (9, "THPS"),
    (10, "TVPS"),
    (11, "CGA"),
    (12, "BPX"),
    (13, "FGP"),
    (14, "PPD"),
    (15, "PPC"),
    (16, "SHPS"),
    (17, "SVPS"),
    (18, "AMP"),
    (20, "COM"),
    (21, "SEG"),
    (22, "NQM"),
    (23, "SQM"),
    (24, "FQM"),
    (25, "ASEG"),
    (26, "SCF"),
    (27, "SIF"),
    (30, "DMM"),
    (31, "FAP"),
    (46, "SUB"),
    (47, "CON"),
    (901, "FCT"),
    (902, "ANN"),
    (903, "DUI"),
    (904, "MMS"),
    (993, "SAN"),
    (994, "EFR"),
    (995, "ASC"),
    (996, "HAS"),
    (997, "SOR"),
    (998, "GEO"),
    (999, "DATA"),
];

const TYPE_15: &[Entry] = &[
    (1, "LEN"),
    (2, "IDC"),
    (4, "SRC"),
    (6, "HLL"),
    (7, "VLL"),
    (9, "THPS"),
    (10, "TVPS"),
    (11, "CGA"),
    (999, "DATA"),
];

const LEN_IDC_DATA: &[Entry] = &[(1, "LEN"), (2, "IDC"), (999, "DATA")];

const TYPE_21: &[Entry] = &[
    (1, "LEN"),
    (2, "IDC"),
    (4, "SRC"),
    (5, "ACD"),
    (6, "MDI"),
    (15, "AFT"),
    (16, "SEG"),
    (999, "DATA"),
];

/// Looks up the aliases table for a given record type, if NIST-ITL
/// defines one.
fn table_for(record_type: u16) -> Option<&'static [Entry]> {
    Some(match record_type {
        1 => TYPE_1,
        2 | 9 | 11 | 12 | 18 | 98 => LEN_IDC_ONLY,
        10 => TYPE_10,
        13 => TYPE_13,
        14 => TYPE_14,
        15 => TYPE_15,
        16 | 17 | 19 | 20 | 22 | 99 => LEN_IDC_DATA,
        21 => TYPE_21,
        _ => return None,
    })
}

/// Returns the mnemonic attached to `(record_type, tag)`, if any.
pub fn alias(record_type: u16, tag: u16) -> Option<&'static str> {
    table_for(record_type)?
        .iter()
        .find(|(t, _)| *t == tag)
        .map(|(_, name)| *name)
}

/// Returns the tag number named `mnemonic` within `record_type`, if any.
pub fn tag_for_alias(record_type: u16, mnemonic: &str) -> Option<u16> {
    table_for(record_type)?
        .iter()
        .find(|(_, name)| *name == mnemonic)
        .map(|(tag, _)| *tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_well_known_mnemonics() {
        assert_eq!(alias(1, 3), Some("CNT"));
        assert_eq!(alias(10, 999), Some("DATA"));
        assert_eq!(alias(13, 901), Some("FCT"));
        assert_eq!(alias(2, 2), Some("IDC"));
    }

    #[test]
    fn unknown_tags_have_no_alias() {
        assert_eq!(alias(10, 12345), None);
        assert_eq!(alias(255, 1), None);
    }

    #[test]
    fn reverse_lookup_is_case_sensitive() {
        assert_eq!(tag_for_alias(1, "CNT"), Some(3));
        assert_eq!(tag_for_alias(1, "cnt"), None);
        assert_eq!(tag_for_alias(14, "FAP"), Some(31));
        assert_eq!(tag_for_alias(14, "nope"), None);
    }
}
