// Copyright 2022 Oxide Computer Company

//! The AI dictionary: entry and component model, compiled entry attributes,
//! and the table with its derived indices (AI-length-by-prefix and the
//! key-qualifier sequence set) plus lookup with unknown-AI vivification.

use crate::aitable;
use crate::error::{ErrorKind, Gs1Error};
use crate::lint::Linter;
use std::cmp::Ordering;
use std::sync::LazyLock;

pub const MIN_AI_LEN: usize = 2;
pub const MAX_AI_LEN: usize = 4;
pub const MAX_AI_VALUE_LEN: usize = 90;

/// Maximum number of extracted AI elements per document.
pub const MAX_AIS: usize = 64;

/// Maximum input size accepted by any ingest operation.
pub const MAX_DATA: usize = 8191;

/// Character set of an AI component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cset {
    /// `N`: digits only.
    Numeric,
    /// `X`: CSET 82.
    Cset82,
    /// `Y`: CSET 39.
    Cset39,
    /// `Z`: file-safe base 64.
    Cset64,
}

/// Whether an AI may appear as a GS1 Digital Link URI data attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DlDataAttr {
    No,
    Allowed,
    /// Placeholder class carried by vivified unknown AIs; permitted only
    /// while the `UnknownAiNotDlAttr` validation is disabled.
    Unknown,
}

/// One component of an AI's value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiComponent {
    pub cset: Cset,
    pub min: usize,
    pub max: usize,
    pub optional: bool,
    pub linters: Vec<Linter>,
}

impl AiComponent {
    pub fn new(
        cset: Cset,
        min: usize,
        max: usize,
        optional: bool,
        linters: Vec<Linter>,
    ) -> Self {
        Self { cset, min, max, optional, linters }
    }
}

/// A compiled entry attribute. The space-separated attribute syntax of a
/// dictionary source is parsed once at table construction so that the
/// validators and the DL subsystem walk typed structures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiAttr {
    /// This AI is a DL primary key; each element is one alternative
    /// qualifier sequence (empty when the key takes no qualifiers).
    DlPkey(Vec<Vec<String>>),
    /// AI prefix patterns that must not appear alongside this AI.
    Ex(Vec<String>),
    /// Requisite groups: at least one group must be fully present. The raw
    /// text is retained for error reporting.
    Req { raw: String, groups: Vec<Vec<String>> },
}

impl AiAttr {
    /// Parse the space-separated attribute tokens of a dictionary entry.
    pub fn parse_list(attrs: &str) -> Result<Vec<AiAttr>, Gs1Error> {
        let mut out = Vec::new();
        for token in attrs.split_whitespace() {
            if token == "dlpkey" {
                out.push(AiAttr::DlPkey(vec![vec![]]));
            } else if let Some(spec) = token.strip_prefix("dlpkey=") {
                let alternatives = spec
                    .split('|')
                    .map(|alt| {
                        alt.split(',')
                            .filter(|q| !q.is_empty())
                            .map(str::to_string)
                            .collect()
                    })
                    .collect();
                out.push(AiAttr::DlPkey(alternatives));
            } else if let Some(spec) = token.strip_prefix("ex=") {
                out.push(AiAttr::Ex(
                    spec.split(',')
                        .filter(|p| !p.is_empty())
                        .map(str::to_string)
                        .collect(),
                ));
            } else if let Some(spec) = token.strip_prefix("req=") {
                let groups = spec
                    .split(',')
                    .map(|g| {
                        g.split('+')
                            .filter(|m| !m.is_empty())
                            .map(str::to_string)
                            .collect()
                    })
                    .collect();
                out.push(AiAttr::Req { raw: spec.to_string(), groups });
            } else {
                return Err(Gs1Error::new(
                    ErrorKind::AiTableBadAttribute,
                    format!("unrecognised AI attribute: {}", token),
                ));
            }
        }
        Ok(out)
    }
}

/// One dictionary entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiEntry {
    pub ai: String,
    pub fnc1_required: bool,
    pub dl_data_attr: DlDataAttr,
    pub components: Vec<AiComponent>,
    pub attrs: Vec<AiAttr>,
}

impl AiEntry {
    /// Construct an entry from dictionary-source fields. The attribute
    /// string is compiled here; unknown attribute tokens are rejected.
    pub fn new(
        ai: &str,
        fnc1_required: bool,
        dl_data_attr: DlDataAttr,
        components: Vec<AiComponent>,
        attrs: &str,
    ) -> Result<Self, Gs1Error> {
        if ai.len() < MIN_AI_LEN
            || ai.len() > MAX_AI_LEN
            || !all_digits(ai.as_bytes())
        {
            return Err(Gs1Error::new(
                ErrorKind::AiTableBadAttribute,
                format!("malformed AI code in table: {}", ai),
            ));
        }
        Ok(Self {
            ai: ai.to_string(),
            fnc1_required,
            dl_data_attr,
            components,
            attrs: AiAttr::parse_list(attrs)?,
        })
    }

    /// Overall minimum value length: the sum of mandatory component minima.
    pub fn min_length(&self) -> usize {
        self.components
            .iter()
            .filter(|c| !c.optional)
            .map(|c| c.min)
            .sum()
    }

    /// Overall maximum value length: the sum of component maxima.
    pub fn max_length(&self) -> usize {
        self.components.iter().map(|c| c.max).sum()
    }

    pub(crate) fn dlpkey(&self) -> Option<&[Vec<String>]> {
        self.attrs.iter().find_map(|a| match a {
            AiAttr::DlPkey(alts) => Some(alts.as_slice()),
            _ => None,
        })
    }
}

/// Shape classes for vivified unknown AIs, one per (AI length, prefix-defined
/// value length) combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Synthetic {
    /// AI length unknown from the prefix.
    Unk,
    Unk2v,
    Unk2f2,
    Unk2f14,
    Unk2f16,
    Unk2f18,
    Unk3v,
    Unk3f13,
    Unk4v,
    Unk4f6,
}

/// Reference to an AI entry: either an index into the table or a synthetic
/// unknown-AI class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiEntryRef {
    Known(usize),
    Synthetic(Synthetic),
}

// The synthetic entries are read-only and table-independent. The `ai` field
// carries a placeholder of the vivified AI's length; an empty placeholder
// means the length could not be determined from the prefix.
static SYNTHETIC_AIS: LazyLock<[AiEntry; 10]> = LazyLock::new(|| {
    let make = |ai: &str, fnc1: bool, min: usize, max: usize| AiEntry {
        ai: ai.to_string(),
        fnc1_required: fnc1,
        dl_data_attr: DlDataAttr::Unknown,
        components: vec![AiComponent::new(Cset::Cset82, min, max, false, vec![])],
        attrs: vec![],
    };
    [
        make("", true, 1, MAX_AI_VALUE_LEN),
        make("XX", true, 1, MAX_AI_VALUE_LEN),
        make("XX", false, 2, 2),
        make("XX", false, 14, 14),
        make("XX", false, 16, 16),
        make("XX", false, 18, 18),
        make("XXX", true, 1, MAX_AI_VALUE_LEN),
        make("XXX", false, 13, 13),
        make("XXXX", true, 1, MAX_AI_VALUE_LEN),
        make("XXXX", false, 6, 6),
    ]
});

fn synthetic_index(s: Synthetic) -> usize {
    match s {
        Synthetic::Unk => 0,
        Synthetic::Unk2v => 1,
        Synthetic::Unk2f2 => 2,
        Synthetic::Unk2f14 => 3,
        Synthetic::Unk2f16 => 4,
        Synthetic::Unk2f18 => 5,
        Synthetic::Unk3v => 6,
        Synthetic::Unk3f13 => 7,
        Synthetic::Unk4v => 8,
        Synthetic::Unk4f6 => 9,
    }
}

/// The AI dictionary plus its derived indices.
#[derive(Debug, Clone)]
pub struct AiTable {
    entries: Vec<AiEntry>,
    length_by_prefix: [u8; 100],
    key_qualifiers: Vec<String>,
}

impl AiTable {
    /// Build a table from entries: sorts by AI, derives the
    /// length-by-prefix index (rejecting same-prefix length conflicts) and
    /// the sorted key-qualifier sequence set.
    pub fn new(mut entries: Vec<AiEntry>) -> Result<Self, Gs1Error> {
        entries.sort_by(|a, b| a.ai.cmp(&b.ai));

        let mut length_by_prefix = [0u8; 100];
        for e in &entries {
            let p = prefix_index(e.ai.as_bytes());
            let len = e.ai.len() as u8;
            if length_by_prefix[p] != 0 && length_by_prefix[p] != len {
                return Err(Gs1Error::new(
                    ErrorKind::AiTableBrokenPrefixesDifferInLength,
                    format!(
                        "AI table is broken: AIs beginning {:02} differ in length",
                        p
                    ),
                ));
            }
            length_by_prefix[p] = len;
        }

        let mut key_qualifiers = Vec::new();
        for e in &entries {
            if let Some(alternatives) = e.dlpkey() {
                for alt in alternatives {
                    add_key_qualifiers(&mut key_qualifiers, &e.ai, alt);
                }
            }
        }
        key_qualifiers.sort();
        key_qualifiers.dedup();

        Ok(Self { entries, length_by_prefix, key_qualifiers })
    }

    /// The embedded default table. A failure here is a programmer error in
    /// the embedded data.
    pub fn embedded() -> Self {
        Self::new(aitable::embedded_entries())
            .expect("embedded AI table is well-formed")
    }

    pub fn entries(&self) -> &[AiEntry] {
        &self.entries
    }

    pub fn entry(&self, r: AiEntryRef) -> &AiEntry {
        match r {
            AiEntryRef::Known(i) => &self.entries[i],
            AiEntryRef::Synthetic(s) => &SYNTHETIC_AIS[synthetic_index(s)],
        }
    }

    pub(crate) fn length_by_prefix(&self, ai: &str) -> usize {
        self.length_by_prefix[prefix_index(ai.as_bytes())] as usize
    }

    /// Look up an entry matching `query`. A non-zero `query_len` demands an
    /// exact-length match; zero matches the longest AI that is a prefix of
    /// `query`. With `permit_unknown`, AIs absent from the table are
    /// vivified as synthetic entries, but never when the query would shadow
    /// a known AI and never against a conflicting prefix-defined length.
    pub fn lookup(
        &self,
        query: &str,
        query_len: usize,
        permit_unknown: bool,
    ) -> Option<AiEntryRef> {
        let q = query.as_bytes();

        if query_len != 0 && !(MIN_AI_LEN..=MAX_AI_LEN).contains(&query_len) {
            return None;
        }

        let digits = if query_len != 0 { query_len } else { MIN_AI_LEN };
        if q.len() < digits || !all_digits(&q[..digits]) {
            return None;
        }

        let (mut s, mut e) = (0, self.entries.len());
        while s < e {
            let m = s + (e - s) / 2;
            let entry = &self.entries[m];
            let eb = entry.ai.as_bytes();
            let cmp = strncmp(eb, q, eb.len());
            if cmp == Ordering::Equal {
                if query_len != 0 && eb.len() != query_len {
                    return None; // prefix match of the wrong length
                }
                return Some(AiEntryRef::Known(m));
            }
            // Never vivify an AI that is a true prefix of a known AI.
            if query_len != 0 && strncmp(q, eb, query_len) == Ordering::Equal {
                return None;
            }
            if cmp == Ordering::Less {
                s = m + 1;
            } else {
                e = m;
            }
        }

        if !permit_unknown {
            return None;
        }

        let p = prefix_index(q);
        let ai_len = self.length_by_prefix[p] as usize;
        if query_len != 0 && ai_len != 0 && ai_len != query_len {
            return None;
        }
        if ai_len != 0 && (q.len() < ai_len || !all_digits(&q[..ai_len])) {
            return None;
        }

        let val_len = aitable::FIXED_AI_PREFIX_VALUE_LEN[p];
        let class = match ai_len {
            2 => match val_len {
                0 => Synthetic::Unk2v,
                2 => Synthetic::Unk2f2,
                14 => Synthetic::Unk2f14,
                16 => Synthetic::Unk2f16,
                18 => Synthetic::Unk2f18,
                _ => Synthetic::Unk,
            },
            3 => match val_len {
                0 => Synthetic::Unk3v,
                13 => Synthetic::Unk3f13,
                _ => Synthetic::Unk,
            },
            4 => match val_len {
                0 => Synthetic::Unk4v,
                6 => Synthetic::Unk4f6,
                _ => Synthetic::Unk,
            },
            _ => Synthetic::Unk,
        };
        Some(AiEntryRef::Synthetic(class))
    }

    //
    // key-qualifier sequence set
    //

    pub(crate) fn key_qualifiers(&self) -> &[String] {
        &self.key_qualifiers
    }

    /// Position of the space-joined `seq` in the key-qualifier set.
    pub(crate) fn seq_entry(&self, seq: &[&str]) -> Option<usize> {
        let joined = seq.join(" ");
        self.key_qualifiers.binary_search(&joined).ok()
    }

    pub(crate) fn is_valid_path_seq(&self, seq: &[&str]) -> bool {
        self.seq_entry(seq).is_some()
    }

    pub(crate) fn is_dl_pkey(&self, ai: &str) -> bool {
        self.seq_entry(&[ai]).is_some()
    }
}

// All order-preserving subsequences of `qualifiers`, each appended to the
// key, including the bare key itself.
fn add_key_qualifiers(out: &mut Vec<String>, key: &str, qualifiers: &[String]) {
    let mut seqs = vec![key.to_string()];
    for q in qualifiers {
        let extended: Vec<String> =
            seqs.iter().map(|s| format!("{} {}", s, q)).collect();
        seqs.extend(extended);
    }
    out.append(&mut seqs);
}

fn prefix_index(ai: &[u8]) -> usize {
    ((ai[0] - b'0') * 10 + (ai[1] - b'0')) as usize
}

pub(crate) fn all_digits(s: &[u8]) -> bool {
    !s.is_empty() && s.iter().all(|b| b.is_ascii_digit())
}

// C-style bounded byte comparison: a missing byte compares as NUL.
fn strncmp(a: &[u8], b: &[u8], n: usize) -> Ordering {
    for i in 0..n {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}
