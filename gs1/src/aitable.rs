// Copyright 2022 Oxide Computer Company

//! The embedded default AI table, used when no dictionary has been loaded
//! and as the fallback when a supplied table is rejected.

use crate::ai::Cset::{Cset39 as Y, Cset64 as Z, Cset82 as X, Numeric as N};
use crate::ai::DlDataAttr::{Allowed, No};
use crate::ai::{AiComponent, AiEntry, Cset, DlDataAttr};
use crate::lint::Linter;
use crate::lint::Linter::*;

const DO_FNC1: bool = true;
const NO_FNC1: bool = false;

/// AI prefixes that are pre-defined as fixed-length and do not require
/// termination by an FNC1 character, indexed by the AI's first two digits.
/// Zero means variable-length. The AI table entry normally decides whether
/// an FNC1 is required; this list is consulted when vivifying an unknown AI
/// since not all prefixes are currently in use.
#[rustfmt::skip]
pub(crate) const FIXED_AI_PREFIX_VALUE_LEN: [u8; 100] = [
    18, 14, 14, 14, 16,                             /* (00) - (04) */
     0,  0,  0,  0,  0,  0,
     6,  6,  6,  6,  6,  6,  6,  6,  6,  2,         /* (11) - (20) */
     0,  0,
     0,                                             /* (23) no longer fixed-length */
     0,  0,  0,  0,  0,  0,  0,
     6,  6,  6,  6,  6,  6,                         /* (31) - (36) */
     0,  0,  0,  0,
    13,                                             /* (41)        */
     0,  0,  0,  0,  0,  0,  0,  0,
     0,  0,  0,  0,  0,  0,  0,  0,  0,  0,
     0,  0,  0,  0,  0,  0,  0,  0,  0,  0,
     0,  0,  0,  0,  0,  0,  0,  0,  0,  0,
     0,  0,  0,  0,  0,  0,  0,  0,  0,  0,
     0,  0,  0,  0,  0,  0,  0,  0,  0,  0,
];

fn part(cset: Cset, min: usize, max: usize, linters: &[Linter]) -> AiComponent {
    AiComponent::new(cset, min, max, false, linters.to_vec())
}

fn opt(cset: Cset, min: usize, max: usize, linters: &[Linter]) -> AiComponent {
    AiComponent::new(cset, min, max, true, linters.to_vec())
}

fn e(
    out: &mut Vec<AiEntry>,
    ai: &str,
    fnc1: bool,
    attr: DlDataAttr,
    components: Vec<AiComponent>,
    attrs: &str,
) {
    out.push(
        AiEntry::new(ai, fnc1, attr, components, attrs)
            .expect("embedded AI table entry is well-formed"),
    );
}

/// The embedded table: the working subset of the GS1 General Specifications
/// dictionary carried by this crate.
#[rustfmt::skip]
pub(crate) fn embedded_entries() -> Vec<AiEntry> {
    let mut t = Vec::new();

    e(&mut t, "00", NO_FNC1, No,      vec![part(N, 18, 18, &[Csum, Key])], "dlpkey");
    e(&mut t, "01", NO_FNC1, Allowed, vec![part(N, 14, 14, &[Csum, Key])], "ex=02,255,37 dlpkey=22,10,21|235");
    e(&mut t, "02", NO_FNC1, Allowed, vec![part(N, 14, 14, &[Csum])], "ex=01 req=37");

    e(&mut t, "10", DO_FNC1, Allowed, vec![part(X, 1, 20, &[])], "req=01,02,8006,8026");
    for ai in ["11", "12", "13", "15", "16", "17"] {
        e(&mut t, ai, NO_FNC1, Allowed, vec![part(N, 6, 6, &[Yymmd0])], "");
    }
    e(&mut t, "20", NO_FNC1, Allowed, vec![part(N, 2, 2, &[])], "");
    e(&mut t, "21", DO_FNC1, Allowed, vec![part(X, 1, 20, &[])], "req=01,8006");
    e(&mut t, "22", DO_FNC1, Allowed, vec![part(X, 1, 20, &[])], "req=01,8006");

    e(&mut t, "235", DO_FNC1, No,      vec![part(X, 1, 28, &[])], "ex=21 req=01");
    e(&mut t, "240", DO_FNC1, Allowed, vec![part(X, 1, 30, &[])], "req=01,02,8006,8026");
    e(&mut t, "241", DO_FNC1, Allowed, vec![part(X, 1, 30, &[])], "req=01,02,8006,8026");
    e(&mut t, "242", DO_FNC1, Allowed, vec![part(N, 1, 6, &[])], "req=01,02,8006,8026");
    e(&mut t, "243", DO_FNC1, Allowed, vec![part(X, 1, 20, &[])], "req=01");
    e(&mut t, "250", DO_FNC1, Allowed, vec![part(X, 1, 30, &[])], "req=01,8006 req=21");
    e(&mut t, "251", DO_FNC1, Allowed, vec![part(X, 1, 30, &[])], "req=01,8006");
    e(&mut t, "253", DO_FNC1, Allowed, vec![part(N, 13, 13, &[Csum, Key]), opt(X, 0, 17, &[])], "dlpkey");
    e(&mut t, "254", DO_FNC1, Allowed, vec![part(X, 1, 20, &[])], "req=414");
    e(&mut t, "255", DO_FNC1, Allowed, vec![part(N, 13, 13, &[Csum, Key]), opt(N, 0, 12, &[])], "dlpkey");

    e(&mut t, "30", DO_FNC1, Allowed, vec![part(N, 1, 8, &[])], "req=01,02");
    for n in 0..=5 {
        e(&mut t, &format!("310{}", n), NO_FNC1, Allowed, vec![part(N, 6, 6, &[])], "req=01,02");
        e(&mut t, &format!("320{}", n), NO_FNC1, Allowed, vec![part(N, 6, 6, &[])], "req=01,02");
    }
    e(&mut t, "37", DO_FNC1, Allowed, vec![part(N, 1, 8, &[])], "req=00+02,8026");

    for n in 0..=9 {
        e(&mut t, &format!("390{}", n), DO_FNC1, Allowed, vec![part(N, 1, 15, &[])], "ex=391n req=01");
        e(&mut t, &format!("391{}", n), DO_FNC1, Allowed, vec![part(N, 3, 3, &[Iso4217]), part(N, 1, 15, &[])], "req=01");
        e(&mut t, &format!("392{}", n), DO_FNC1, Allowed, vec![part(N, 1, 15, &[])], "ex=391n,8111 req=01 req=30,31nn,32nn");
        e(&mut t, &format!("393{}", n), DO_FNC1, Allowed, vec![part(N, 3, 3, &[Iso4217]), part(N, 1, 15, &[])], "req=392n");
        e(&mut t, &format!("394{}", n), DO_FNC1, Allowed, vec![part(N, 4, 4, &[])], "req=255 ex=394n,8111");
    }
    for n in 0..=6 {
        e(&mut t, &format!("395{}", n), DO_FNC1, Allowed, vec![part(N, 6, 6, &[])], "ex=392n,393n,394n,8111");
    }

    e(&mut t, "400", DO_FNC1, Allowed, vec![part(X, 1, 30, &[])], "");
    e(&mut t, "401", DO_FNC1, Allowed, vec![part(X, 1, 30, &[Key])], "dlpkey");
    e(&mut t, "402", DO_FNC1, Allowed, vec![part(N, 17, 17, &[Csum, Key])], "dlpkey");
    e(&mut t, "403", DO_FNC1, Allowed, vec![part(X, 1, 30, &[])], "req=00");
    for ai in ["410", "411", "412", "413", "415", "416"] {
        e(&mut t, ai, NO_FNC1, Allowed, vec![part(N, 13, 13, &[Csum, Key])], "");
    }
    e(&mut t, "414", NO_FNC1, Allowed, vec![part(N, 13, 13, &[Csum, Key])], "dlpkey=254|7040");
    e(&mut t, "417", NO_FNC1, Allowed, vec![part(N, 13, 13, &[Csum, Key])], "dlpkey=7040");
    e(&mut t, "420", DO_FNC1, Allowed, vec![part(X, 1, 20, &[])], "ex=421");
    e(&mut t, "421", DO_FNC1, Allowed, vec![part(N, 3, 3, &[Iso3166]), part(X, 1, 9, &[])], "ex=420");
    e(&mut t, "422", DO_FNC1, Allowed, vec![part(N, 3, 3, &[Iso3166])], "ex=426");
    e(&mut t, "423", DO_FNC1, Allowed, vec![part(N, 3, 15, &[Iso3166List])], "ex=425,426");
    e(&mut t, "424", DO_FNC1, Allowed, vec![part(N, 3, 3, &[Iso3166])], "ex=426");
    e(&mut t, "425", DO_FNC1, Allowed, vec![part(N, 3, 15, &[Iso3166List])], "ex=423,426");
    e(&mut t, "426", DO_FNC1, Allowed, vec![part(N, 3, 3, &[Iso3166])], "ex=422,423,424,425");
    e(&mut t, "427", DO_FNC1, Allowed, vec![part(X, 1, 3, &[])], "req=422");

    e(&mut t, "7007", DO_FNC1, Allowed, vec![part(N, 6, 6, &[Yymmdd]), opt(N, 6, 6, &[Yymmdd])], "req=01,02");
    e(&mut t, "7023", DO_FNC1, Allowed, vec![part(X, 1, 30, &[Key])], "");
    e(&mut t, "7040", DO_FNC1, Allowed, vec![part(N, 1, 1, &[]), part(X, 1, 1, &[]), part(X, 1, 1, &[]), part(X, 1, 1, &[])], "");
    for ai in ["710", "711", "712", "713", "714", "715"] {
        e(&mut t, ai, DO_FNC1, Allowed, vec![part(N, 1, 20, &[])], "");
    }

    e(&mut t, "8001", DO_FNC1, Allowed, vec![part(N, 4, 4, &[NonZero]), part(N, 5, 5, &[NonZero]), part(N, 3, 3, &[NonZero]), part(N, 1, 1, &[Winding]), part(N, 1, 1, &[])], "req=01");
    e(&mut t, "8002", DO_FNC1, Allowed, vec![part(X, 1, 20, &[])], "");
    e(&mut t, "8003", DO_FNC1, Allowed, vec![part(N, 1, 1, &[Zero]), part(N, 13, 13, &[Csum, Key]), opt(X, 0, 16, &[])], "dlpkey");
    e(&mut t, "8004", DO_FNC1, Allowed, vec![part(X, 1, 30, &[Key])], "dlpkey=7040");
    e(&mut t, "8005", DO_FNC1, Allowed, vec![part(N, 6, 6, &[])], "req=01,02");
    e(&mut t, "8006", DO_FNC1, Allowed, vec![part(N, 14, 14, &[Csum]), part(N, 4, 4, &[PieceOfTotal])], "ex=01 dlpkey=22,10,21");
    e(&mut t, "8010", DO_FNC1, No,      vec![part(Y, 1, 30, &[Key])], "dlpkey=8011");
    e(&mut t, "8011", DO_FNC1, Allowed, vec![part(N, 1, 12, &[NoZeroPrefix])], "req=8010");
    e(&mut t, "8012", DO_FNC1, Allowed, vec![part(X, 1, 20, &[])], "");
    e(&mut t, "8013", DO_FNC1, Allowed, vec![part(X, 1, 25, &[CsumAlpha, Key])], "dlpkey");
    e(&mut t, "8017", DO_FNC1, Allowed, vec![part(N, 18, 18, &[Csum, Key])], "dlpkey=8019 ex=8018");
    e(&mut t, "8018", DO_FNC1, Allowed, vec![part(N, 18, 18, &[Csum, Key])], "dlpkey=8019 ex=8017");
    e(&mut t, "8019", DO_FNC1, Allowed, vec![part(N, 1, 10, &[])], "req=8017,8018");
    e(&mut t, "8026", DO_FNC1, Allowed, vec![part(N, 14, 14, &[Csum]), part(N, 4, 4, &[PieceOfTotal])], "ex=01 req=37");
    e(&mut t, "8030", DO_FNC1, No,      vec![part(Z, 1, 90, &[])], "req=00,01+21,253,255,8003,8004,8006+21,8010+8011,8017,8018");
    e(&mut t, "8111", DO_FNC1, Allowed, vec![part(N, 4, 4, &[])], "req=255");
    e(&mut t, "8200", DO_FNC1, No,      vec![part(X, 1, 70, &[])], "req=01");

    e(&mut t, "90", DO_FNC1, Allowed, vec![part(X, 1, 30, &[])], "");
    for ai in ["91", "92", "93", "94", "95", "96", "97", "98", "99"] {
        e(&mut t, ai, DO_FNC1, Allowed, vec![part(X, 1, 90, &[])], "");
    }

    t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::AiTable;

    #[test]
    fn embedded_table_builds() {
        let t = AiTable::embedded();
        assert!(t.entries().len() > 100);
    }

    #[test]
    fn embedded_table_is_sorted_and_unique() {
        let t = AiTable::embedded();
        let ais: Vec<&str> =
            t.entries().iter().map(|e| e.ai.as_str()).collect();
        let mut sorted = ais.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(ais, sorted);
    }

    #[test]
    fn fixed_prefix_list_spot_checks() {
        assert_eq!(FIXED_AI_PREFIX_VALUE_LEN[0], 18);
        assert_eq!(FIXED_AI_PREFIX_VALUE_LEN[1], 14);
        assert_eq!(FIXED_AI_PREFIX_VALUE_LEN[4], 16);
        assert_eq!(FIXED_AI_PREFIX_VALUE_LEN[11], 6);
        assert_eq!(FIXED_AI_PREFIX_VALUE_LEN[20], 2);
        assert_eq!(FIXED_AI_PREFIX_VALUE_LEN[23], 0);
        assert_eq!(FIXED_AI_PREFIX_VALUE_LEN[36], 6);
        assert_eq!(FIXED_AI_PREFIX_VALUE_LEN[41], 13);
        assert_eq!(FIXED_AI_PREFIX_VALUE_LEN[80], 0);
        assert_eq!(FIXED_AI_PREFIX_VALUE_LEN[99], 0);
    }
}
