// Copyright 2022 Oxide Computer Company

//! Cross-AI validation: a fixed registry of global validators run in
//! registration order over the extracted table. Locked entries cannot be
//! toggled through the API.

use crate::ai::AiAttr;
use crate::engine::{AiElement, Engine};
use crate::error::{ErrorKind, Gs1Error};

/// Identities of the global validators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    MutexAis,
    RequisiteAis,
    RepeatedAis,
    DigSigSerialKey,
    /// Policy toggle only: whether a vivified unknown AI is rejected as a
    /// DL URI data attribute. Consulted by the DL parser and generator.
    UnknownAiNotDlAttr,
}

const NUM_VALIDATIONS: usize = 5;

fn index(v: Validation) -> usize {
    match v {
        Validation::MutexAis => 0,
        Validation::RequisiteAis => 1,
        Validation::RepeatedAis => 2,
        Validation::DigSigSerialKey => 3,
        Validation::UnknownAiNotDlAttr => 4,
    }
}

#[derive(Debug, Clone, Copy)]
struct ValidationEntry {
    locked: bool,
    enabled: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct ValidationTable {
    entries: [ValidationEntry; NUM_VALIDATIONS],
}

impl ValidationTable {
    pub(crate) fn new() -> Self {
        let entry = |locked, enabled| ValidationEntry { locked, enabled };
        Self {
            //         locked enabled
            entries: [
                entry(true, true),  // MutexAis
                entry(false, true), // RequisiteAis
                entry(true, true),  // RepeatedAis
                entry(true, true),  // DigSigSerialKey
                entry(false, true), // UnknownAiNotDlAttr
            ],
        }
    }

    pub(crate) fn enabled(&self, v: Validation) -> bool {
        self.entries[index(v)].enabled
    }

    pub(crate) fn set_enabled(
        &mut self,
        v: Validation,
        enabled: bool,
    ) -> Result<(), Gs1Error> {
        let e = &mut self.entries[index(v)];
        if e.locked {
            return Err(Gs1Error::new(
                ErrorKind::ValidationLocked,
                "validation cannot be toggled",
            ));
        }
        e.enabled = enabled;
        Ok(())
    }
}

impl Default for ValidationTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Run each enabled validator in registration order; the first failure
/// stops validation.
pub(crate) fn validate_ais(eng: &Engine) -> Result<(), Gs1Error> {
    for v in [
        Validation::MutexAis,
        Validation::RequisiteAis,
        Validation::RepeatedAis,
        Validation::DigSigSerialKey,
    ] {
        if !eng.validations.enabled(v) {
            continue;
        }
        match v {
            Validation::MutexAis => validate_mutex(eng)?,
            Validation::RequisiteAis => validate_requisites(eng)?,
            Validation::RepeatedAis => validate_repeats(eng)?,
            Validation::DigSigSerialKey => validate_digsig_serial(eng)?,
            Validation::UnknownAiNotDlAttr => {}
        }
    }
    Ok(())
}

/*
 * Search the extracted AIs for a match with an AI pattern: the pattern's
 * leading digits must prefix the candidate's AI text. A candidate whose
 * leading bytes equal the ignored element's over the whole pattern length
 * is skipped, so that self-referencing patterns such as "394n" do not
 * trigger on the element carrying them or on its repeats.
 *
 * Given the small number of extracted AIs there is nothing to be gained
 * over walking the table.
 */
fn ai_exists<'a>(
    eng: &'a Engine,
    pattern: &str,
    ignore: Option<&AiElement>,
) -> Option<&'a AiElement> {
    let data = eng.data_str.as_bytes();
    let plen = pattern.bytes().take_while(u8::is_ascii_digit).count();
    let pat = &pattern.as_bytes()[..plen];

    for el in eng.ai_elements() {
        let start = el.ai_start;
        if &data[start..(start + plen).min(data.len())] != pat {
            continue;
        }
        if let Some(ign) = ignore {
            let k = pattern.len();
            let a = &data[start..(start + k).min(data.len())];
            let b = &data
                [ign.ai_start..(ign.ai_start + k).min(data.len())];
            if a == b {
                continue;
            }
        }
        return Some(el);
    }
    None
}

// "ex" attributes: mutually exclusive AIs must not appear together.
fn validate_mutex(eng: &Engine) -> Result<(), Gs1Error> {
    for el in eng.ai_elements() {
        let entry = eng.table.entry(el.entry);
        for attr in &entry.attrs {
            let AiAttr::Ex(patterns) = attr else { continue };
            for pattern in patterns {
                if let Some(matched) = ai_exists(eng, pattern, Some(el)) {
                    return Err(Gs1Error::new(
                        ErrorKind::InvalidAiPairs,
                        format!(
                            "it is invalid to pair AI ({}) with AI ({})",
                            el.ai(&eng.data_str),
                            matched.ai(&eng.data_str)
                        ),
                    ));
                }
            }
        }
    }
    Ok(())
}

// "req" attributes: at least one requisite group must be fully present.
// An empty group is trivially satisfied.
fn validate_requisites(eng: &Engine) -> Result<(), Gs1Error> {
    for el in eng.ai_elements() {
        let entry = eng.table.entry(el.entry);
        for attr in &entry.attrs {
            let AiAttr::Req { raw, groups } = attr else { continue };
            let satisfied = groups.is_empty()
                || groups.iter().any(|group| {
                    group
                        .iter()
                        .all(|m| ai_exists(eng, m, Some(el)).is_some())
                });
            if !satisfied {
                return Err(Gs1Error::new(
                    ErrorKind::RequiredAisNotSatisfied,
                    format!(
                        "one or more requisite AIs for AI ({}) are not \
                         satisfied: {}",
                        el.ai(&eng.data_str),
                        raw
                    ),
                ));
            }
        }
    }
    Ok(())
}

// Repeated AIs must carry identical values. (Repeats occur when reads of
// multiple symbols on one label are concatenated.)
fn validate_repeats(eng: &Engine) -> Result<(), Gs1Error> {
    let els: Vec<&AiElement> = eng.ai_elements().collect();
    for (i, el) in els.iter().enumerate() {
        for el2 in &els[i + 1..] {
            if el.ai(&eng.data_str) == el2.ai(&eng.data_str)
                && el.value(&eng.data_str) != el2.value(&eng.data_str)
            {
                return Err(Gs1Error::new(
                    ErrorKind::InstancesOfAiHaveDifferentValues,
                    format!(
                        "multiple instances of AI ({}) have different values",
                        el.ai(&eng.data_str)
                    ),
                ));
            }
        }
    }
    Ok(())
}

// AIs (253), (255) and (8003) must include their serial component when a
// digital signature (8030) is present.
fn validate_digsig_serial(eng: &Engine) -> Result<(), Gs1Error> {
    if ai_exists(eng, "8030", None).is_none() {
        return Ok(());
    }
    for el in eng.ai_elements() {
        let entry = eng.table.entry(el.entry);
        if !matches!(entry.ai.as_str(), "253" | "255" | "8003") {
            continue;
        }
        if el.val_len == entry.min_length() {
            return Err(Gs1Error::new(
                ErrorKind::SerialNotPresent,
                format!(
                    "AI ({}) must include a serial component when paired \
                     with AI (8030)",
                    el.ai(&eng.data_str)
                ),
            ));
        }
    }
    Ok(())
}
