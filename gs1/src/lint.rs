// Copyright 2022 Oxide Computer Company

//! Per-component linters and the AI component validation pipeline.
//!
//! Each linter is a pure function of a candidate component string to either
//! success or a positional error (code, byte offset, byte length). The
//! registry is fixed: a dictionary source naming a linter outside this set
//! fails at table-load time.

use crate::ai::{AiEntry, Cset};
use crate::error::{ErrorKind, Gs1Error};
use std::fmt;

/// Error codes reportable by linters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintErr {
    NonDigitCharacter,
    InvalidCset82Character,
    InvalidCset39Character,
    InvalidCset64Character,
    InvalidCset64Padding,
    InvalidCset32Character,
    IncorrectCheckDigit,
    TooShortForCheckDigit,
    IncorrectCheckPair,
    TooShortForCheckPair,
    TooShortForKey,
    InvalidGcpPrefix,
    DateTooShort,
    DateTooLong,
    IllegalMonth,
    IllegalDay,
    NotIso3166,
    NotIso4217,
    NotZero,
    IllegalZeroValue,
    IllegalZeroPrefix,
    InvalidWindingDirection,
    ZeroPieceNumber,
    ZeroTotalPieces,
    PieceNumberExceedsTotal,
}

impl LintErr {
    pub fn message(&self) -> &'static str {
        match self {
            LintErr::NonDigitCharacter => "non-digit character",
            LintErr::InvalidCset82Character => {
                "invalid CSET 82 character"
            }
            LintErr::InvalidCset39Character => {
                "invalid CSET 39 character"
            }
            LintErr::InvalidCset64Character => {
                "invalid CSET 64 character"
            }
            LintErr::InvalidCset64Padding => "invalid CSET 64 padding",
            LintErr::InvalidCset32Character => {
                "invalid CSET 32 character"
            }
            LintErr::IncorrectCheckDigit => "incorrect check digit",
            LintErr::TooShortForCheckDigit => {
                "too short for a check digit"
            }
            LintErr::IncorrectCheckPair => "incorrect check character pair",
            LintErr::TooShortForCheckPair => {
                "too short for a check character pair"
            }
            LintErr::TooShortForKey => "too short for a GS1 key",
            LintErr::InvalidGcpPrefix => "invalid GS1 Company Prefix",
            LintErr::DateTooShort => "date is too short",
            LintErr::DateTooLong => "date is too long",
            LintErr::IllegalMonth => "illegal month",
            LintErr::IllegalDay => "illegal day of the month",
            LintErr::NotIso3166 => "not an ISO 3166 country code",
            LintErr::NotIso4217 => "not an ISO 4217 currency code",
            LintErr::NotZero => "must be zero",
            LintErr::IllegalZeroValue => "illegal zero value",
            LintErr::IllegalZeroPrefix => "illegal zero prefix",
            LintErr::InvalidWindingDirection => {
                "invalid winding direction"
            }
            LintErr::ZeroPieceNumber => "piece number must not be zero",
            LintErr::ZeroTotalPieces => "total pieces must not be zero",
            LintErr::PieceNumberExceedsTotal => {
                "piece number exceeds total pieces"
            }
        }
    }
}

impl fmt::Display for LintErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

/// A positional linter failure within a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LintError {
    pub code: LintErr,
    /// Byte offset of the offending range, on a character boundary.
    pub pos: usize,
    /// Byte length of the offending range.
    pub len: usize,
}

pub type LintResult = Result<(), LintError>;

/// The fixed registry of named linters that AI components may reference in
/// addition to their character-set linter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linter {
    Csum,
    CsumAlpha,
    Key,
    Yymmdd,
    Yymmd0,
    Iso3166,
    Iso3166List,
    Iso4217,
    Zero,
    NonZero,
    NoZeroPrefix,
    Winding,
    PieceOfTotal,
}

impl Linter {
    /// Resolve a linter name as it appears in a dictionary source. Unknown
    /// names are rejected so that a dictionary referencing a linter this
    /// registry does not implement fails at load time.
    pub fn from_name(name: &str) -> Option<Linter> {
        match name {
            "csum" => Some(Linter::Csum),
            "csumalpha" => Some(Linter::CsumAlpha),
            "key" => Some(Linter::Key),
            "yymmdd" => Some(Linter::Yymmdd),
            "yymmd0" => Some(Linter::Yymmd0),
            "iso3166" => Some(Linter::Iso3166),
            "iso3166list" => Some(Linter::Iso3166List),
            "iso4217" => Some(Linter::Iso4217),
            "zero" => Some(Linter::Zero),
            "nonzero" => Some(Linter::NonZero),
            "nozeroprefix" => Some(Linter::NoZeroPrefix),
            "winding" => Some(Linter::Winding),
            "pieceoftotal" => Some(Linter::PieceOfTotal),
            _ => None,
        }
    }

    pub fn lint(&self, val: &str) -> LintResult {
        match self {
            Linter::Csum => lint_csum(val),
            Linter::CsumAlpha => lint_csumalpha(val),
            Linter::Key => lint_key(val),
            Linter::Yymmdd => lint_date(val, false),
            Linter::Yymmd0 => lint_date(val, true),
            Linter::Iso3166 => lint_iso3166(val),
            Linter::Iso3166List => lint_iso3166list(val),
            Linter::Iso4217 => lint_iso4217(val),
            Linter::Zero => lint_zero(val),
            Linter::NonZero => lint_nonzero(val),
            Linter::NoZeroPrefix => lint_nozeroprefix(val),
            Linter::Winding => lint_winding(val),
            Linter::PieceOfTotal => lint_pieceoftotal(val),
        }
    }
}

//
// character-set linters, applied before any named linter
//

const CSET82: &str = "!\"%&'()*+,-./0123456789:;<=>?\
                      ABCDEFGHIJKLMNOPQRSTUVWXYZ_\
                      abcdefghijklmnopqrstuvwxyz";

const CSET39: &str = "#-/0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

const CSET64: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ\
                      abcdefghijklmnopqrstuvwxyz0123456789-_";

// Check character pair alphabet for csumalpha (file-safe CSET 32).
const CSET32: &str = "23456789ABCDEFGHJKLMNPQRSTUVWXYZ";

pub(crate) fn cset_lint(cset: Cset, val: &str) -> LintResult {
    match cset {
        Cset::Numeric => lint_csetnumeric(val),
        Cset::Cset82 => lint_member(val, CSET82, LintErr::InvalidCset82Character),
        Cset::Cset39 => lint_member(val, CSET39, LintErr::InvalidCset39Character),
        Cset::Cset64 => lint_cset64(val),
    }
}

fn lint_csetnumeric(val: &str) -> LintResult {
    for (pos, c) in val.char_indices() {
        if !c.is_ascii_digit() {
            return Err(LintError {
                code: LintErr::NonDigitCharacter,
                pos,
                len: c.len_utf8(),
            });
        }
    }
    Ok(())
}

fn lint_member(val: &str, set: &str, code: LintErr) -> LintResult {
    for (pos, c) in val.char_indices() {
        if !set.contains(c) {
            return Err(LintError { code, pos, len: c.len_utf8() });
        }
    }
    Ok(())
}

// CSET 64 values are unpadded; '=' appearing only as a trailing run is a
// padding error, anywhere else it is an invalid character.
fn lint_cset64(val: &str) -> LintResult {
    let unpadded = val.trim_end_matches('=');
    if unpadded.len() != val.len() {
        lint_member(unpadded, CSET64, LintErr::InvalidCset64Character)?;
        return Err(LintError {
            code: LintErr::InvalidCset64Padding,
            pos: unpadded.len(),
            len: val.len() - unpadded.len(),
        });
    }
    lint_member(val, CSET64, LintErr::InvalidCset64Character)
}

//
// named linters
//

fn digit_values(val: &str) -> Result<Vec<u32>, LintError> {
    val.char_indices()
        .map(|(pos, c)| {
            c.to_digit(10).ok_or(LintError {
                code: LintErr::NonDigitCharacter,
                pos,
                len: c.len_utf8(),
            })
        })
        .collect()
}

// Standard GS1 mod-10 check digit: weights 3,1,3,... from the rightmost
// data digit; the final digit is the check.
fn lint_csum(val: &str) -> LintResult {
    let digits = digit_values(val)?;
    if digits.len() < 2 {
        return Err(LintError {
            code: LintErr::TooShortForCheckDigit,
            pos: 0,
            len: val.len(),
        });
    }
    let data = &digits[..digits.len() - 1];
    let sum: u32 = data
        .iter()
        .rev()
        .enumerate()
        .map(|(i, d)| d * if i % 2 == 0 { 3 } else { 1 })
        .sum();
    let check = (10 - sum % 10) % 10;
    if check != digits[digits.len() - 1] {
        return Err(LintError {
            code: LintErr::IncorrectCheckDigit,
            pos: val.len() - 1,
            len: 1,
        });
    }
    Ok(())
}

// GS1 GMN check character pair: each data character is valued by its CSET 82
// position and weighted by doubling powers of two from the right, mod 1021;
// the sum indexes a pair of CSET 32 characters.
fn lint_csumalpha(val: &str) -> LintResult {
    if val.len() < 3 {
        return Err(LintError {
            code: LintErr::TooShortForCheckPair,
            pos: 0,
            len: val.len(),
        });
    }
    let data = &val[..val.len() - 2];
    let pair = &val[val.len() - 2..];

    let mut weight: u32 = 2;
    let mut sum: u32 = 0;
    for (pos, c) in data.char_indices().rev() {
        let v = match CSET82.find(c) {
            Some(v) => v as u32,
            None => {
                return Err(LintError {
                    code: LintErr::InvalidCset32Character,
                    pos,
                    len: c.len_utf8(),
                })
            }
        };
        sum = (sum + v * weight) % 1021;
        weight = (weight * 2) % 1021;
    }

    for (pos, c) in pair.char_indices() {
        if !CSET32.contains(c) {
            return Err(LintError {
                code: LintErr::InvalidCset32Character,
                pos: val.len() - 2 + pos,
                len: c.len_utf8(),
            });
        }
    }

    let cset32 = CSET32.as_bytes();
    let expect = [cset32[(sum >> 5) as usize], cset32[(sum & 31) as usize]];
    if pair.as_bytes() != expect {
        return Err(LintError {
            code: LintErr::IncorrectCheckPair,
            pos: val.len() - 2,
            len: 2,
        });
    }
    Ok(())
}

// A GS1 key must be long enough to hold a GS1 Company Prefix, which begins
// with at least four digits.
fn lint_key(val: &str) -> LintResult {
    if val.len() < 4 {
        return Err(LintError {
            code: LintErr::TooShortForKey,
            pos: 0,
            len: val.len(),
        });
    }
    if !val[..4].bytes().all(|b| b.is_ascii_digit()) {
        return Err(LintError {
            code: LintErr::InvalidGcpPrefix,
            pos: 0,
            len: 4,
        });
    }
    Ok(())
}

// YYMMDD; `day_zero` permits DD == 00 (day not specified).
fn lint_date(val: &str, day_zero: bool) -> LintResult {
    if val.len() < 6 {
        return Err(LintError {
            code: LintErr::DateTooShort,
            pos: 0,
            len: val.len(),
        });
    }
    if val.len() > 6 {
        return Err(LintError {
            code: LintErr::DateTooLong,
            pos: 0,
            len: val.len(),
        });
    }
    let digits = digit_values(val)?;
    let yy = digits[0] * 10 + digits[1];
    let mm = digits[2] * 10 + digits[3];
    let dd = digits[4] * 10 + digits[5];
    if mm < 1 || mm > 12 {
        return Err(LintError { code: LintErr::IllegalMonth, pos: 2, len: 2 });
    }
    if dd == 0 {
        if day_zero {
            return Ok(());
        }
        return Err(LintError { code: LintErr::IllegalDay, pos: 4, len: 2 });
    }
    let max = match mm {
        4 | 6 | 9 | 11 => 30,
        2 => {
            if yy % 4 == 0 {
                29
            } else {
                28
            }
        }
        _ => 31,
    };
    if dd > max {
        return Err(LintError { code: LintErr::IllegalDay, pos: 4, len: 2 });
    }
    Ok(())
}

fn lint_iso3166(val: &str) -> LintResult {
    if val.len() != 3 || iso3166_code(val).is_none() {
        return Err(LintError {
            code: LintErr::NotIso3166,
            pos: 0,
            len: val.len(),
        });
    }
    Ok(())
}

fn lint_iso3166list(val: &str) -> LintResult {
    let tail = val.len() % 3;
    if val.is_empty() || tail != 0 {
        return Err(LintError {
            code: LintErr::NotIso3166,
            pos: val.len() - tail,
            len: tail,
        });
    }
    for i in (0..val.len()).step_by(3) {
        if iso3166_code(&val[i..i + 3]).is_none() {
            return Err(LintError {
                code: LintErr::NotIso3166,
                pos: i,
                len: 3,
            });
        }
    }
    Ok(())
}

fn lint_iso4217(val: &str) -> LintResult {
    let ok = val.len() == 3
        && val
            .parse::<u16>()
            .map(|n| ISO4217_NUMERIC.binary_search(&n).is_ok())
            .unwrap_or(false);
    if !ok {
        return Err(LintError {
            code: LintErr::NotIso4217,
            pos: 0,
            len: val.len(),
        });
    }
    Ok(())
}

fn iso3166_code(triple: &str) -> Option<u16> {
    let n = triple.parse::<u16>().ok()?;
    ISO3166_NUMERIC.binary_search(&n).ok().map(|_| n)
}

fn lint_zero(val: &str) -> LintResult {
    if !val.bytes().all(|b| b == b'0') {
        return Err(LintError {
            code: LintErr::NotZero,
            pos: 0,
            len: val.len(),
        });
    }
    Ok(())
}

fn lint_nonzero(val: &str) -> LintResult {
    if val.bytes().all(|b| b == b'0') {
        return Err(LintError {
            code: LintErr::IllegalZeroValue,
            pos: 0,
            len: val.len(),
        });
    }
    Ok(())
}

fn lint_nozeroprefix(val: &str) -> LintResult {
    if val.starts_with('0') {
        return Err(LintError {
            code: LintErr::IllegalZeroPrefix,
            pos: 0,
            len: 1,
        });
    }
    Ok(())
}

fn lint_winding(val: &str) -> LintResult {
    if val != "0" && val != "1" && val != "9" {
        return Err(LintError {
            code: LintErr::InvalidWindingDirection,
            pos: 0,
            len: val.len(),
        });
    }
    Ok(())
}

// PPTT: piece number and total pieces, both non-zero, piece <= total.
fn lint_pieceoftotal(val: &str) -> LintResult {
    digit_values(val)?;
    let half = val.len() / 2;
    let (piece, total) = (&val[..half], &val[half..]);
    if val.is_empty() || val.len() % 2 != 0 || piece.bytes().all(|b| b == b'0')
    {
        return Err(LintError {
            code: LintErr::ZeroPieceNumber,
            pos: 0,
            len: half,
        });
    }
    if total.bytes().all(|b| b == b'0') {
        return Err(LintError {
            code: LintErr::ZeroTotalPieces,
            pos: half,
            len: half,
        });
    }
    if piece.parse::<u64>().unwrap_or(0) > total.parse::<u64>().unwrap_or(0) {
        return Err(LintError {
            code: LintErr::PieceNumberExceedsTotal,
            pos: 0,
            len: val.len(),
        });
    }
    Ok(())
}

//
// component pipeline
//

fn byte_len_of_chars(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len())
}

/// Validate `val` against the components of `entry`, running the
/// character-set linter and then each extra linter per component. Returns
/// the number of input bytes consumed, or a linter/length error whose markup
/// frames the offending range within the full value.
pub(crate) fn validate_ai_val(
    ai: &str,
    entry: &AiEntry,
    val: &str,
) -> Result<usize, Gs1Error> {
    if val.is_empty() {
        return Err(Gs1Error::new(
            ErrorKind::AiDataIsEmpty,
            format!("AI ({}) data is empty", ai),
        ));
    }

    let mut p = 0;
    for part in &entry.components {
        let rest = &val[p..];
        let avail = rest.chars().count();
        let take = part.max.min(avail);
        if part.optional && take == 0 {
            continue;
        }
        if take < part.min {
            return Err(Gs1Error::new(
                ErrorKind::AiDataHasIncorrectLength,
                format!("AI ({}) data has incorrect length", ai),
            ));
        }
        let take_bytes = byte_len_of_chars(rest, take);
        let comp = &rest[..take_bytes];

        let result = cset_lint(part.cset, comp)
            .and_then(|_| part.linters.iter().try_for_each(|l| l.lint(comp)));
        if let Err(e) = result {
            let abs = p + e.pos;
            let markup = format!(
                "({}){}|{}|{}",
                ai,
                &val[..abs],
                &val[abs..abs + e.len],
                &val[abs + e.len..]
            );
            return Err(Gs1Error::linter(
                format!("AI ({}): {}", ai, e.code.message()),
                e.code,
                markup,
            ));
        }

        p += take_bytes;
    }

    Ok(p)
}

// ISO 3166-1 numeric country codes.
#[rustfmt::skip]
const ISO3166_NUMERIC: &[u16] = &[
      4,   8,  10,  12,  16,  20,  24,  28,  31,  32,  36,  40,  44,  48,
     50,  51,  52,  56,  60,  64,  68,  70,  72,  74,  76,  84,  86,  90,
     92,  96, 100, 104, 108, 112, 116, 120, 124, 132, 136, 140, 144, 148,
    152, 156, 158, 162, 166, 170, 174, 175, 178, 180, 184, 188, 191, 192,
    196, 203, 204, 208, 212, 214, 218, 222, 226, 231, 232, 233, 234, 238,
    239, 242, 246, 248, 250, 254, 258, 260, 262, 266, 268, 270, 275, 276,
    288, 292, 296, 300, 304, 308, 312, 316, 320, 324, 328, 332, 334, 336,
    340, 344, 348, 352, 356, 360, 364, 368, 372, 376, 380, 384, 388, 392,
    398, 400, 404, 408, 410, 414, 417, 418, 422, 426, 428, 430, 434, 438,
    440, 442, 446, 450, 454, 458, 462, 466, 470, 474, 478, 480, 484, 492,
    496, 498, 499, 500, 504, 508, 512, 516, 520, 524, 528, 531, 533, 534,
    535, 540, 548, 554, 558, 562, 566, 570, 574, 578, 580, 581, 583, 584,
    585, 586, 591, 598, 600, 604, 608, 612, 616, 620, 624, 626, 630, 634,
    638, 642, 643, 646, 652, 654, 659, 660, 662, 663, 666, 670, 674, 678,
    682, 686, 688, 690, 694, 702, 703, 704, 705, 706, 710, 716, 724, 728,
    729, 732, 740, 744, 748, 752, 756, 760, 762, 764, 768, 772, 776, 780,
    784, 788, 792, 795, 796, 798, 800, 804, 807, 818, 826, 831, 832, 833,
    834, 840, 850, 854, 858, 860, 862, 876, 882, 887, 894,
];

// ISO 4217 numeric currency codes.
#[rustfmt::skip]
const ISO4217_NUMERIC: &[u16] = &[
      8,  12,  32,  36,  44,  48,  50,  51,  52,  60,  64,  68,  72,  84,
     90,  96, 104, 108, 116, 124, 132, 136, 144, 152, 156, 170, 174, 188,
    192, 203, 208, 214, 222, 230, 232, 238, 242, 262, 270, 292, 320, 324,
    328, 332, 340, 344, 348, 352, 356, 360, 364, 368, 376, 388, 392, 398,
    400, 404, 408, 410, 414, 417, 418, 422, 426, 430, 434, 446, 454, 458,
    462, 480, 484, 496, 498, 504, 512, 516, 524, 532, 533, 548, 554, 558,
    566, 578, 586, 590, 598, 600, 604, 608, 634, 643, 646, 654, 682, 690,
    694, 702, 704, 706, 710, 728, 748, 752, 756, 760, 764, 776, 780, 784,
    788, 818, 826, 834, 840, 858, 860, 882, 886, 901, 925, 926, 927, 928,
    929, 930, 931, 932, 933, 934, 936, 938, 941, 943, 944, 946, 947, 948,
    949, 950, 951, 952, 953, 955, 956, 957, 958, 959, 960, 961, 962, 963,
    964, 965, 967, 968, 969, 970, 971, 972, 973, 975, 976, 977, 978, 979,
    980, 981, 984, 985, 986, 990, 994, 997, 999,
];
