// Copyright 2022 Oxide Computer Company

//! AI element-string handling: the bracketed `(AI)value` parser, the
//! unbracketed `^...` processor, and rendering of the extracted table back
//! to bracketed notation.

use crate::ai::{AiEntry, AiEntryRef, Synthetic, MAX_AIS};
use crate::engine::{AiElement, DlPathOrder, Engine, ExtractedAi};
use crate::error::{ErrorKind, Gs1Error};
use crate::lint;

/// Length and content pre-checks applied by the parsers before running the
/// component linters: reporting a checksum failure is unhelpful when the AI
/// value is the wrong length, and a literal `^` would be conflated with
/// FNC1 once the value reaches the normalized buffer.
pub(crate) fn ai_val_length_content_check(
    ai: &str,
    entry: &AiEntry,
    val: &str,
) -> Result<(), Gs1Error> {
    let len = val.chars().count();
    if len < entry.min_length() {
        return Err(Gs1Error::new(
            ErrorKind::AiValueIsTooShort,
            format!("AI ({}) value is too short", ai),
        ));
    }
    if len > entry.max_length() {
        return Err(Gs1Error::new(
            ErrorKind::AiValueIsTooLong,
            format!("AI ({}) value is too long", ai),
        ));
    }
    if val.contains('^') {
        return Err(Gs1Error::new(
            ErrorKind::AiContainsIllegalCaratCharacter,
            format!("AI ({}) contains an illegal ^ character", ai),
        ));
    }
    Ok(())
}

/// Parse bracketed AI syntax into the engine's normalized buffer, populating
/// the extracted table, then run the unbracketed processor over the result
/// for component linting.
pub(crate) fn parse_ai_data(
    eng: &mut Engine,
    ai_data: &str,
) -> Result<(), Gs1Error> {
    let mut fnc1req = true;
    let mut p = 0;

    let parse_failed = || {
        Gs1Error::new(ErrorKind::AiParseFailed, "failed to parse AI data")
    };

    while p < ai_data.len() {
        if !ai_data[p..].starts_with('(') {
            return Err(parse_failed());
        }
        p += 1;
        let ailen = match ai_data[p..].find(')') {
            Some(n) => n,
            None => return Err(parse_failed()),
        };
        let ai = &ai_data[p..p + ailen];

        let entry_ref = match eng.table.lookup(
            ai,
            ailen,
            eng.permit_unknown_ais,
        ) {
            Some(r) => r,
            None => {
                return Err(Gs1Error::new(
                    ErrorKind::AiUnrecognised,
                    format!("AI ({}) is not recognised", ai),
                ))
            }
        };

        if fnc1req {
            eng.data_str.push('^');
        }
        let ai_start = eng.data_str.len();
        eng.data_str.push_str(ai);
        fnc1req = eng.table.entry(entry_ref).fnc1_required;

        // Advance to the start of the value; an AI at the very end of the
        // input has nothing to carry.
        p += ailen + 1;
        if p >= ai_data.len() {
            return Err(parse_failed());
        }

        let val_start = eng.data_str.len();
        loop {
            match ai_data[p..].find('(') {
                None => {
                    eng.data_str.push_str(&ai_data[p..]);
                    p = ai_data.len();
                    break;
                }
                Some(rel) => {
                    let at = p + rel;
                    if at > 0 && ai_data.as_bytes()[at - 1] == b'\\' {
                        // An escaped data bracket: emit the run up to the
                        // escape and the literal bracket, keep scanning.
                        eng.data_str.push_str(&ai_data[p..at - 1]);
                        eng.data_str.push('(');
                        p = at + 1;
                    } else {
                        eng.data_str.push_str(&ai_data[p..at]);
                        p = at;
                        break;
                    }
                }
            }
        }

        let val = &eng.data_str[val_start..];
        let entry = eng.table.entry(entry_ref);
        ai_val_length_content_check(ai, entry, val)?;

        if eng.extracted.len() >= MAX_AIS {
            return Err(Gs1Error::new(ErrorKind::TooManyAis, "too many AIs"));
        }
        let val_len = eng.data_str.len() - val_start;
        eng.extracted.push(ExtractedAi::Ai(AiElement {
            entry: entry_ref,
            ai_start,
            ai_len: ailen,
            val_start,
            val_len,
            dl_path_order: DlPathOrder::Attribute,
        }));
    }

    process_ai_data(eng, false)
}

/// Validate the normalized buffer (`^` = FNC1) and, when `extract` is set,
/// populate the extracted table from it.
pub(crate) fn process_ai_data(
    eng: &mut Engine,
    extract: bool,
) -> Result<(), Gs1Error> {
    let data = eng.data_str.clone();

    if !data.starts_with('^') {
        return Err(Gs1Error::new(
            ErrorKind::MissingFnc1InFirstPosition,
            "missing FNC1 in first position",
        ));
    }
    let mut p = 1;

    if p == data.len() {
        return Err(Gs1Error::new(
            ErrorKind::AiDataEmpty,
            "the AI data is empty",
        ));
    }

    while p < data.len() {
        /*
         * Find an AI matching a prefix of the remaining data. An unknown AI
         * of unknown length cannot be accepted while extracting: there is
         * no way to split the AI from its value.
         */
        let entry_ref = eng
            .table
            .lookup(&data[p..], 0, eng.permit_unknown_ais)
            .filter(|r| {
                !(extract && *r == AiEntryRef::Synthetic(Synthetic::Unk))
            });
        let entry_ref = match entry_ref {
            Some(r) => r,
            None => {
                return Err(Gs1Error::new(
                    ErrorKind::NoAiForPrefix,
                    format!("no AI matches the prefix of: {}", &data[p..]),
                ))
            }
        };

        let entry = eng.table.entry(entry_ref);
        let ailen = entry.ai.len();
        let ai_start = p;
        let ai = &data[ai_start..ai_start + ailen];
        p += ailen;

        // The value runs to the next FNC1 or the end of the data.
        let r = data[p..].find('^').map(|i| p + i).unwrap_or(data.len());

        let vallen = lint::validate_ai_val(ai, entry, &data[p..r])?;

        if extract {
            if eng.extracted.len() >= MAX_AIS {
                return Err(Gs1Error::new(
                    ErrorKind::TooManyAis,
                    "too many AIs",
                ));
            }
            eng.extracted.push(ExtractedAi::Ai(AiElement {
                entry: entry_ref,
                ai_start,
                ai_len: ailen,
                val_start: p,
                val_len: vallen,
                dl_path_order: DlPathOrder::Attribute,
            }));
        }

        // An AI requiring FNC1 must be terminated by one unless the data
        // ends here.
        p += vallen;
        if entry.fnc1_required
            && p < data.len()
            && data.as_bytes()[p] != b'^'
        {
            return Err(Gs1Error::new(
                ErrorKind::AiDataIsTooLong,
                format!("AI ({}) data is too long", ai),
            ));
        }

        // Skip FNC1, even a superfluous one after a fixed-length AI.
        if p < data.len() && data.as_bytes()[p] == b'^' {
            p += 1;
        }
    }

    Ok(())
}

/// Render the extracted table back to bracketed notation. Literal `(` in a
/// value is escaped as `\(`; DL-ignored query parameters are not AI data
/// and are skipped.
pub(crate) fn render_ai_data(eng: &Engine) -> String {
    let mut out = String::new();
    for el in eng.ai_elements() {
        out.push('(');
        out.push_str(el.ai(&eng.data_str));
        out.push(')');
        out.push_str(&el.value(&eng.data_str).replace('(', "\\("));
    }
    out
}
