// Copyright 2022 Oxide Computer Company

//! GS1 Digital Link URI handling: parsing a DL URI into the normalized AI
//! buffer with key/qualifier enforcement, and generating a canonical or
//! custom-stem DL URI from the extracted table.

use crate::ai::{DlDataAttr, MAX_AIS};
use crate::engine::{AiElement, DlPathOrder, Engine, ExtractedAi};
use crate::error::{ErrorKind, Gs1Error};
use crate::validate::Validation;
use regex::Regex;
use std::sync::LazyLock;

const CANONICAL_DL_STEM: &str = "https://id.gs1.org";

// Characters permissible anywhere in a DL URI, including percent.
static URI_CHARACTERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9\-._~:/?#\[\]@!$&'()*+,;=%]*$").unwrap()
});

// Characters from the URI set that are illegal within a domain name. The
// domain form is otherwise deliberately not validated, to avoid ossifying
// IPv4/IPv6/port notations.
const BAD_DOMAIN_CHARACTERS: &str = "_~?#@!$&'()*+,;=%";

fn is_unreserved(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')
}

/// Reverse percent-encoding. In query mode `+` decodes to space. Returns
/// `None` when a `%00` is decoded; a malformed escape is kept literal.
fn uri_unescape(input: &str, is_query_component: bool) -> Option<String> {
    let b = input.as_bytes();
    let mut out = String::with_capacity(b.len());
    let mut i = 0;
    while i < b.len() {
        if b[i] == b'%'
            && i + 2 < b.len()
            && b[i + 1].is_ascii_hexdigit()
            && b[i + 2].is_ascii_hexdigit()
        {
            let v = u8::from_str_radix(&input[i + 1..i + 3], 16).unwrap();
            if v == 0 {
                return None;
            }
            out.push(v as char);
            i += 3;
        } else if is_query_component && b[i] == b'+' {
            out.push(' ');
            i += 1;
        } else {
            out.push(b[i] as char);
            i += 1;
        }
    }
    Some(out)
}

/// Percent-escape a component value. Unreserved characters pass through; in
/// query mode a space becomes `+`; everything else is `%HH` per UTF-8 byte.
fn uri_escape(input: &str, is_query_component: bool) -> String {
    let mut out = String::with_capacity(input.len());
    let mut buf = [0u8; 4];
    for c in input.chars() {
        if is_unreserved(c) {
            out.push(c);
        } else if c == ' ' && is_query_component {
            out.push('+');
        } else {
            for b in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{:02X}", b));
            }
        }
    }
    out
}

// Legacy zero-suppressed GTIN handling: when enabled, a GTIN-{8,12,13} in
// AI (01) is padded up to a GTIN-14.
fn pad_gtin(eng: &Engine, entry_ai: &str, val: String) -> String {
    if eng.permit_zero_suppressed_gtin_in_dl_uris
        && entry_ai == "01"
        && matches!(val.len(), 8 | 12 | 13)
    {
        format!("{:0>14}", val)
    } else {
        val
    }
}

/// Parse a GS1 DL URI, validating the key to key-qualifier associations in
/// the path information, and convert it to the normalized AI data string
/// with `^` = FNC1, populating the extracted table.
///
/// Deprecated "convenience alphas" (`/gtin/...`) are not supported.
pub(crate) fn parse_dl_uri(eng: &mut Engine, dl_data: &str) -> Result<(), Gs1Error> {
    if !URI_CHARACTERS.is_match(dl_data) {
        return Err(Gs1Error::new(
            ErrorKind::UriContainsIllegalCharacters,
            "URI contains illegal characters",
        ));
    }

    let p = ["https://", "HTTPS://", "http://", "HTTP://"]
        .iter()
        .find_map(|s| dl_data.strip_prefix(*s))
        .ok_or_else(|| {
            Gs1Error::new(
                ErrorKind::UriContainsIllegalScheme,
                "URI contains an illegal scheme",
            )
        })?;

    let slash = match p.find('/') {
        Some(n) if n >= 1 => n,
        _ => {
            return Err(Gs1Error::new(
                ErrorKind::UriMissingDomainAndPathInfo,
                "URI is missing the domain and path info",
            ))
        }
    };
    let domain = &p[..slash];
    if domain.chars().any(|c| BAD_DOMAIN_CHARACTERS.contains(c)) {
        return Err(Gs1Error::new(
            ErrorKind::DomainContainsIllegalCharacters,
            "domain contains illegal characters",
        ));
    }

    // The fragment delimits the end of the data; the query parameter marker
    // delimits the end of the path info.
    let rest = &p[slash..];
    let rest = &rest[..rest.find('#').unwrap_or(rest.len())];
    let (path, query) = match rest.find('?') {
        Some(n) => (&rest[..n], Some(&rest[n + 1..])),
        None => (rest, None),
    };

    /*
     * Search backwards from the end of the path info looking for an
     * "/AI/value" pair whose AI is a DL primary key. Everything to the left
     * of the deepest such pair is a custom stem and carries no semantics.
     */
    let segs: Vec<&str> = path[1..].split('/').collect();
    let mut root = None;
    let mut i = segs.len() as isize - 2;
    while i >= 0 {
        let cand = segs[i as usize];
        match eng.table.lookup(cand, cand.len(), eng.permit_unknown_ais) {
            None => break,
            Some(r) => {
                if eng.table.is_dl_pkey(&eng.table.entry(r).ai) {
                    root = Some(i as usize);
                    break;
                }
            }
        }
        i -= 2;
    }
    let root = root.ok_or_else(|| {
        Gs1Error::new(
            ErrorKind::NoGs1DlKeysFoundInPathInfo,
            "no GS1 DL keys found in the path info",
        )
    })?;

    let mut fnc1req = true;
    let mut path_seq: Vec<String> = Vec::new();

    let mut k = root;
    while k < segs.len() {
        let ai = segs[k];
        let raw_val = match segs.get(k + 1) {
            Some(v) => *v,
            None => {
                return Err(Gs1Error::new(
                    ErrorKind::DlUriParseFailed,
                    "failed to parse DL URI",
                ))
            }
        };
        let entry_ref = eng
            .table
            .lookup(ai, ai.len(), eng.permit_unknown_ais)
            .ok_or_else(|| {
                Gs1Error::new(
                    ErrorKind::DlUriParseFailed,
                    "failed to parse DL URI",
                )
            })?;
        let entry = eng.table.entry(entry_ref);

        if raw_val.is_empty() {
            return Err(Gs1Error::new(
                ErrorKind::AiValuePathElementIsEmpty,
                format!("AI ({}) value path element is empty", ai),
            ));
        }

        let val = uri_unescape(raw_val, false).ok_or_else(|| {
            Gs1Error::new(
                ErrorKind::DecodedAiFromDlPathInfoContainsIllegalNull,
                format!(
                    "decoded AI ({}) from path info contains an illegal null",
                    ai
                ),
            )
        })?;
        let val = pad_gtin(eng, &entry.ai, val);

        let fnc1 = entry.fnc1_required;
        let entry_ai = entry.ai.clone();
        ai_checked_emit(eng, entry_ref, ai, &val, &mut fnc1req, fnc1)?;
        // Assign the element its position within the DL path.
        if let Some(ExtractedAi::Ai(el)) = eng.extracted.last_mut() {
            el.dl_path_order = DlPathOrder::Path(path_seq.len());
        }
        path_seq.push(entry_ai);

        k += 2;
    }

    let num_path = path_seq.len();

    if let Some(query) = query {
        for seg in query.split('&').filter(|s| !s.is_empty()) {
            let eq = match seg.find('=') {
                Some(n) => n,
                None => {
                    // A parameter with no value is retained verbatim but is
                    // not AI data.
                    push_ignored(eng, seg)?;
                    continue;
                }
            };
            let key = &seg[..eq];
            let raw_val = &seg[eq + 1..];

            // Numeric-only query parameters must resolve to a known AI;
            // non-numeric parameters are retained verbatim.
            let numeric = key.bytes().all(|b| b.is_ascii_digit());
            if !numeric {
                push_ignored(eng, seg)?;
                continue;
            }
            let entry_ref = match eng.table.lookup(
                key,
                key.len(),
                eng.permit_unknown_ais,
            ) {
                Some(r) => r,
                None => {
                    return Err(Gs1Error::new(
                        ErrorKind::UnknownAiInQueryParams,
                        format!("unknown AI ({}) in query parameters", key),
                    ))
                }
            };
            let entry = eng.table.entry(entry_ref);

            if raw_val.is_empty() {
                return Err(Gs1Error::new(
                    ErrorKind::AiValueQueryElementIsEmpty,
                    format!("AI ({}) value query element is empty", key),
                ));
            }

            let val = uri_unescape(raw_val, true).ok_or_else(|| {
                Gs1Error::new(
                    ErrorKind::DecodedAiValueFromQueryParamsContainsIllegalNull,
                    format!(
                        "decoded AI ({}) value from query parameters \
                         contains an illegal null",
                        key
                    ),
                )
            })?;
            let val = pad_gtin(eng, &entry.ai, val);

            let fnc1 = entry.fnc1_required;
            ai_checked_emit(eng, entry_ref, key, &val, &mut fnc1req, fnc1)?;
        }
    }

    /*
     * The AIs extracted from the path info must form a sequence present in
     * the key-qualifier set.
     */
    let seq: Vec<&str> = path_seq.iter().map(String::as_str).collect();
    if !eng.table.is_valid_path_seq(&seq) {
        return Err(Gs1Error::new(
            ErrorKind::InvalidKeyQualifierSequence,
            "the path info is not a valid key-qualifier sequence",
        ));
    }

    /*
     * Validate the query-extracted attributes: no duplicate AIs anywhere,
     * each attribute must be permitted as a DL data attribute, and an
     * attribute that would slot into the path sequence as a qualifier
     * belongs in the path info instead.
     */
    if num_path < MAX_AIS {
        for i in 0..eng.extracted.len() {
            let ExtractedAi::Ai(el) = &eng.extracted[i] else {
                continue;
            };
            if el.dl_path_order != DlPathOrder::Attribute {
                continue;
            }
            let ai_text = el.ai(&eng.data_str);

            for prior in eng.extracted[..i].iter() {
                let ExtractedAi::Ai(el2) = prior else { continue };
                if el2.ai(&eng.data_str) == ai_text {
                    return Err(Gs1Error::new(
                        ErrorKind::DuplicateAi,
                        format!("AI ({}) is duplicated", ai_text),
                    ));
                }
            }

            check_dl_attr(eng, el)?;

            let entry_ai = eng.table.entry(el.entry).ai.as_str();
            for j in 1..=num_path {
                let mut trial: Vec<&str> = Vec::with_capacity(num_path + 1);
                trial.extend(seq[..j].iter());
                trial.push(entry_ai);
                trial.extend(seq[j..].iter());
                if eng.table.is_valid_path_seq(&trial) {
                    return Err(Gs1Error::new(
                        ErrorKind::AiShouldBeInPathInfo,
                        format!("AI ({}) should be in the path info", entry_ai),
                    ));
                }
            }
        }
    }

    // Lint the normalized data that was emitted.
    crate::elements::process_ai_data(eng, false)
}

// Emit one AI/value pair into the normalized buffer with FNC1 rules, run
// the length/carat pre-check, and record the extracted element.
fn ai_checked_emit(
    eng: &mut Engine,
    entry_ref: crate::ai::AiEntryRef,
    ai: &str,
    val: &str,
    fnc1req: &mut bool,
    entry_fnc1: bool,
) -> Result<(), Gs1Error> {
    if *fnc1req {
        eng.data_str.push('^');
    }
    let ai_start = eng.data_str.len();
    eng.data_str.push_str(ai);
    *fnc1req = entry_fnc1;
    let val_start = eng.data_str.len();
    eng.data_str.push_str(val);

    let entry = eng.table.entry(entry_ref);
    crate::elements::ai_val_length_content_check(ai, entry, val)?;

    if eng.extracted.len() >= MAX_AIS {
        return Err(Gs1Error::new(ErrorKind::TooManyAis, "too many AIs"));
    }
    eng.extracted.push(ExtractedAi::Ai(AiElement {
        entry: entry_ref,
        ai_start,
        ai_len: ai.len(),
        val_start,
        val_len: val.len(),
        dl_path_order: DlPathOrder::Attribute,
    }));
    Ok(())
}

fn push_ignored(eng: &mut Engine, seg: &str) -> Result<(), Gs1Error> {
    if eng.extracted.len() >= MAX_AIS {
        return Err(Gs1Error::new(ErrorKind::TooManyAis, "too many AIs"));
    }
    eng.extracted.push(ExtractedAi::DlIgnored(seg.to_string()));
    Ok(())
}

fn check_dl_attr(eng: &Engine, el: &AiElement) -> Result<(), Gs1Error> {
    let entry = eng.table.entry(el.entry);
    let forbidden = match entry.dl_data_attr {
        DlDataAttr::No => true,
        DlDataAttr::Unknown => {
            eng.validations.enabled(Validation::UnknownAiNotDlAttr)
        }
        DlDataAttr::Allowed => false,
    };
    if forbidden {
        return Err(Gs1Error::new(
            ErrorKind::AiIsNotValidDataAttribute,
            format!(
                "AI ({}) is not a valid DL URI data attribute",
                el.ai(&eng.data_str)
            ),
        ));
    }
    Ok(())
}

/// Generate a DL URI from the extracted table: the first extracted AI that
/// is a primary key starts the path, the key-qualifier sequence matching
/// the most extracted AIs supplies the path order, and the remaining AIs
/// are emitted as query attributes, fixed-length first, de-duplicated.
pub(crate) fn generate_dl_uri(
    eng: &mut Engine,
    stem: Option<&str>,
) -> Result<String, Gs1Error> {
    /*
     * Select the first AI that is a valid primary key for a DL.
     */
    let mut key_entry = None;
    for el in eng.ai_elements() {
        let ai = eng.table.entry(el.entry).ai.as_str();
        if let Some(ke) = eng.table.seq_entry(&[ai]) {
            key_entry = Some(ke);
            break;
        }
    }
    let key_entry = key_entry.ok_or_else(|| {
        Gs1Error::new(
            ErrorKind::CannotCreateDlUriWithoutPrimaryKeyAi,
            "cannot create a DL URI without a primary key AI",
        )
    })?;

    /*
     * Among the sequences starting with that key, pick the one matching
     * the most extracted AIs; the sorted order of the set breaks ties in
     * favour of the first.
     */
    let kq = eng.table.key_qualifiers();
    let key = kq[key_entry].clone();
    let mut best = key_entry;
    let mut max_qualifiers = 0;
    for (ke, seq) in kq.iter().enumerate().skip(key_entry + 1) {
        let mut tokens = seq.split(' ');
        if tokens.next() != Some(key.as_str()) {
            break;
        }
        let n = tokens
            .map(|t| {
                eng.ai_elements()
                    .filter(|el| eng.table.entry(el.entry).ai == t)
                    .count()
            })
            .sum::<usize>();
        if n > max_qualifiers {
            max_qualifiers = n;
            best = ke;
        }
    }
    let chosen: Vec<String> =
        kq[best].split(' ').map(str::to_string).collect();

    /*
     * Apply the path order from the chosen sequence to the elements; all
     * other elements are attributes.
     */
    for idx in 0..eng.extracted.len() {
        let entry_ref = match &eng.extracted[idx] {
            ExtractedAi::Ai(el) => el.entry,
            ExtractedAi::DlIgnored(_) => continue,
        };
        let pos = {
            let ai = &eng.table.entry(entry_ref).ai;
            chosen.iter().position(|t| t == ai)
        };
        if let ExtractedAi::Ai(el) = &mut eng.extracted[idx] {
            el.dl_path_order = match pos {
                Some(i) => DlPathOrder::Path(i),
                None => DlPathOrder::Attribute,
            };
        }
    }

    let mut out = stem.unwrap_or(CANONICAL_DL_STEM).to_string();
    if out.ends_with('/') {
        out.pop();
    }

    /*
     * Path components in sequence order: the primary key, then whichever
     * qualifiers are present.
     */
    for i in 0..chosen.len() {
        for el in eng.ai_elements() {
            if el.dl_path_order != DlPathOrder::Path(i) {
                continue;
            }
            out.push('/');
            out.push_str(el.ai(&eng.data_str));
            out.push('/');
            out.push_str(&uri_escape(el.value(&eng.data_str), false));
            break;
        }
    }

    /*
     * Query attributes in received order, fixed-length first, skipping
     * duplicates of elements already emitted in the same class.
     */
    out.push('?');
    let elements: Vec<AiElement> = eng
        .extracted
        .iter()
        .filter_map(|x| match x {
            ExtractedAi::Ai(el) => Some(el.clone()),
            ExtractedAi::DlIgnored(_) => None,
        })
        .collect();
    for emit_fixed in [true, false] {
        for (i, el) in elements.iter().enumerate() {
            if el.dl_path_order != DlPathOrder::Attribute {
                continue;
            }
            let fnc1 = eng.table.entry(el.entry).fnc1_required;
            if fnc1 == emit_fixed {
                continue;
            }
            let ai_text = el.ai(&eng.data_str);

            let dup = elements[..i].iter().any(|el2| {
                eng.table.entry(el2.entry).fnc1_required != emit_fixed
                    && el2.ai(&eng.data_str) == ai_text
            });
            if dup {
                continue;
            }

            check_dl_attr(eng, el)?;

            out.push_str(ai_text);
            out.push('=');
            out.push_str(&uri_escape(el.value(&eng.data_str), true));
            out.push('&');
        }
    }

    // Trim the final character, either '?' or '&'.
    out.pop();

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements;
    use crate::engine::Engine;
    use crate::error::ErrorKind;

    #[test]
    fn unescape_path_and_query_modes() {
        let cases = [
            ("", "", ""),
            ("test", "test", "test"),
            ("+", "+", " "), // "+" means space only in query components
            ("%20", " ", " "),
            ("%20AB", " AB", " AB"),
            ("A%20B", "A B", "A B"),
            ("AB%20", "AB ", "AB "),
            ("ABC%2", "ABC%2", "ABC%2"), // off the end, kept literal
            ("ABCD%", "ABCD%", "ABCD%"),
            ("A%20%20B", "A  B", "A  B"),
            ("A%4FB", "AOB", "AOB"),
            ("A%4fB", "AOB", "AOB"),
            ("A%4gB", "A%4gB", "A%4gB"), // non-hex digit
            ("A%g4B", "A%g4B", "A%g4B"),
        ];
        for (input, path, query) in cases {
            assert_eq!(
                uri_unescape(input, false).unwrap(),
                path,
                "path-mode {}",
                input
            );
            assert_eq!(
                uri_unescape(input, true).unwrap(),
                query,
                "query-mode {}",
                input
            );
        }
        // A decoded NUL is trapped.
        assert_eq!(uri_unescape("A%00B", false), None);
        assert_eq!(uri_unescape("A%00B", true), None);
    }

    #[test]
    fn escape_path_and_query_modes() {
        assert_eq!(
            uri_escape("ABCDEFGHIJKLMNOPQRSTUVWXYZ", false),
            "ABCDEFGHIJKLMNOPQRSTUVWXYZ"
        );
        assert_eq!(uri_escape("0123456789-._~", false), "0123456789-._~");
        assert_eq!(
            uri_escape("!\"#%&'()*+,/:;<=>?", false),
            "%21%22%23%25%26%27%28%29%2A%2B%2C%2F%3A%3B%3C%3D%3E%3F"
        );
        assert_eq!(uri_escape(" AB", false), "%20AB");
        assert_eq!(uri_escape(" AB", true), "+AB");
        assert_eq!(uri_escape("A  B", true), "A++B");
        assert_eq!(uri_escape("A B", false), "A%20B");
    }

    fn parse_with(uri: &str, setup: impl Fn(&mut Engine)) -> Result<String, Gs1Error> {
        let mut eng = Engine::new();
        setup(&mut eng);
        parse_dl_uri(&mut eng, uri)?;
        Ok(eng.data_str)
    }

    fn parse(uri: &str) -> Result<String, Gs1Error> {
        parse_with(uri, |_| ())
    }

    fn parse_err(uri: &str) -> ErrorKind {
        parse(uri).unwrap_err().kind()
    }

    #[test]
    fn uri_structure_failures() {
        assert_eq!(parse_err(""), ErrorKind::UriContainsIllegalScheme);
        assert_eq!(parse_err("ftp://"), ErrorKind::UriContainsIllegalScheme);
        assert_eq!(
            parse_err("HtTp://a/00/006141411234567890"),
            ErrorKind::UriContainsIllegalScheme
        );
        assert_eq!(
            parse_err("http://"),
            ErrorKind::UriMissingDomainAndPathInfo
        );
        assert_eq!(
            parse_err("http:///"),
            ErrorKind::UriMissingDomainAndPathInfo
        );
        assert_eq!(
            parse_err("http://a"),
            ErrorKind::UriMissingDomainAndPathInfo
        );
        assert_eq!(
            parse_err("http://a/"),
            ErrorKind::NoGs1DlKeysFoundInPathInfo
        );
        assert_eq!(
            parse_err("http://a/b"),
            ErrorKind::NoGs1DlKeysFoundInPathInfo
        );
        assert_eq!(
            parse_err("http://a/b/"),
            ErrorKind::NoGs1DlKeysFoundInPathInfo
        );
        assert_eq!(
            parse_err("https://00/006141411234567890"),
            ErrorKind::NoGs1DlKeysFoundInPathInfo
        );
        assert_eq!(
            parse_err("https://$a/00/006141411234567890"),
            ErrorKind::DomainContainsIllegalCharacters
        );
        assert_eq!(
            parse_err("https://a$/00/006141411234567890"),
            ErrorKind::DomainContainsIllegalCharacters
        );
        assert_eq!(
            parse_err("https://a/01/12312312312333 "),
            ErrorKind::UriContainsIllegalCharacters
        );
    }

    #[test]
    fn schemes_and_domains() {
        for uri in [
            "http://a/00/006141411234567890",
            "HTTP://a/00/006141411234567890",
            "https://a/00/006141411234567890",
            "HTTPS://a/00/006141411234567890",
        ] {
            assert_eq!(parse(uri).unwrap(), "^00006141411234567890");
        }

        // The domain form is deliberately only screened for characters.
        for uri in [
            "https://xn--fsq.xn--0zwm56d/01/12312312312333",
            "https://a./01/12312312312333",
            "https://a:65535/01/12312312312333",
            "https://192.0.2.1/01/12312312312333",
            "https://3232235777/01/12312312312333",
            "https://0300.0250.01.01/01/12312312312333",
            "https://0xC0.0xA8.0x01.0x01/01/12312312312333",
            "https://[2001:db8::1]/01/12312312312333",
        ] {
            assert_eq!(parse(uri).unwrap(), "^0112312312312333", "{}", uri);
        }
        assert_eq!(
            parse_err("https://[fe80::1%25lo]/01/12312312312333"),
            ErrorKind::DomainContainsIllegalCharacters
        );
    }

    #[test]
    fn custom_stems() {
        assert_eq!(
            parse("https://a/stem/00/006141411234567890").unwrap(),
            "^00006141411234567890"
        );
        assert_eq!(
            parse("https://a/more/stem/00/006141411234567890").unwrap(),
            "^00006141411234567890"
        );
        // A fake AI in the stem: the rightmost key wins.
        assert_eq!(
            parse("https://a/00/faux/00/006141411234567890").unwrap(),
            "^00006141411234567890"
        );
        // Trailing slash leaves no AI/value pairing.
        assert_eq!(
            parse_err("https://a/stem/00/006141411234567890/"),
            ErrorKind::NoGs1DlKeysFoundInPathInfo
        );
    }

    #[test]
    fn gtin_zero_suppression() {
        let enable =
            |eng: &mut Engine| eng.set_permit_zero_suppressed_gtin_in_dl_uris(true);

        // GTIN-13, GTIN-12 and GTIN-8 pad to GTIN-14 when permitted.
        assert_eq!(
            parse_with("https://a/01/2112345678900", enable).unwrap(),
            "^0102112345678900"
        );
        assert_eq!(
            parse_with("https://a/01/416000336108", enable).unwrap(),
            "^0100416000336108"
        );
        assert_eq!(
            parse_with("https://a/01/02345673", enable).unwrap(),
            "^0100000002345673"
        );

        for uri in [
            "https://a/01/2112345678900",
            "https://a/01/416000336108",
            "https://a/01/02345673",
        ] {
            assert_eq!(parse_err(uri), ErrorKind::AiValueIsTooShort);
        }

        // The same rule applies to query-string values.
        assert_eq!(
            parse_with("https://a/00/952012345678912345?01=9520123456788", enable)
                .unwrap(),
            "^009520123456789123450109520123456788"
        );
    }

    #[test]
    fn path_qualifiers() {
        assert_eq!(
            parse("https://a/01/12312312312333/22/TEST/10/ABC/21/XYZ")
                .unwrap(),
            "^011231231231233322TEST^10ABC^21XYZ"
        );
        assert_eq!(
            parse("https://a/01/12312312312333/235/TEST").unwrap(),
            "^0112312312312333235TEST"
        );
        assert_eq!(
            parse("https://a/253/1231231231232").unwrap(),
            "^2531231231231232"
        );
        assert_eq!(
            parse("https://a/253/1231231231232TEST5678901234567").unwrap(),
            "^2531231231231232TEST5678901234567"
        );
        assert_eq!(
            parse_err("https://a/253/1231231231232TEST56789012345678"),
            ErrorKind::AiValueIsTooLong
        );
        assert_eq!(
            parse("https://a/8018/123456789012345675/8019/123").unwrap(),
            "^8018123456789012345675^8019123"
        );
        // A trailing slash leaves the last qualifier with no value.
        assert_eq!(
            parse_err("https://a/01/12312312312333/10/"),
            ErrorKind::AiValuePathElementIsEmpty
        );
        // Qualifiers in an order the key-qualifier set does not contain.
        assert_eq!(
            parse_err("https://a/01/12312312312333/21/XYZ/10/ABC"),
            ErrorKind::InvalidKeyQualifierSequence
        );
    }

    #[test]
    fn query_parameters() {
        assert_eq!(
            parse("https://a/stem/00/006141411234567890?").unwrap(),
            "^00006141411234567890"
        );
        assert_eq!(
            parse("https://a/stem/00/006141411234567890?99=ABC").unwrap(),
            "^0000614141123456789099ABC"
        );
        // FNC1 is required after the variable-length (401).
        assert_eq!(
            parse("https://a/stem/401/12345678?99=ABC").unwrap(),
            "^40112345678^99ABC"
        );
        assert_eq!(
            parse("https://a/01/12312312312333?99=ABC&98=XYZ").unwrap(),
            "^011231231231233399ABC^98XYZ"
        );
        assert_eq!(
            parse_err("https://a/01/12312312312333?99="),
            ErrorKind::AiValueQueryElementIsEmpty
        );
        assert_eq!(
            parse_err("https://a/01/12312312312333?99=ABC&999=faux"),
            ErrorKind::UnknownAiInQueryParams
        );
        // Extraneous separators and non-AI parameters are tolerated.
        assert_eq!(
            parse("https://a/01/12312312312333?&&&99=ABC&&&&&&98=XYZ&&&")
                .unwrap(),
            "^011231231231233399ABC^98XYZ"
        );
        assert_eq!(
            parse(
                "https://a/01/12312312312333?singleton1&unknown1=555&99=ABC\
                 &singleton2&unknown2=6666&98=XYZ&unknown3=777&singleton3"
            )
            .unwrap(),
            "^011231231231233399ABC^98XYZ"
        );
    }

    #[test]
    fn ignored_query_params_are_retained() {
        let mut eng = Engine::new();
        parse_dl_uri(
            &mut eng,
            "https://a/01/12312312312333?singleton&unknown=666&99=ABC",
        )
        .unwrap();
        assert_eq!(
            eng.dl_ignored_query_params(),
            vec!["singleton", "unknown=666"]
        );
    }

    #[test]
    fn percent_decoding() {
        assert_eq!(
            parse("https://a/01/12312312312333/22/ABC%2d123?99=ABC&98=XYZ%2f987")
                .unwrap(),
            "^011231231231233322ABC-123^99ABC^98XYZ/987"
        );
        // "+" is literal in path info but a space in query params.
        assert_eq!(
            parse("https://a/01/12312312312333/22/ABC+123?99=ABC").unwrap(),
            "^011231231231233322ABC+123^99ABC"
        );
        assert_eq!(
            parse("https://a/01/12312312312333?98=XYZ+987")
                .unwrap_err()
                .kind(),
            ErrorKind::AiLinterError
        );
        assert_eq!(
            parse_err("https://a/01/12312312312333/22/AB%00C"),
            ErrorKind::DecodedAiFromDlPathInfoContainsIllegalNull
        );
        assert_eq!(
            parse_err("https://a/01/12312312312333?99=AB%00C"),
            ErrorKind::DecodedAiValueFromQueryParamsContainsIllegalNull
        );
    }

    #[test]
    fn fragments_are_discarded() {
        assert_eq!(
            parse("https://a/01/12312312312333/22/test/10/abc/21/xyz#")
                .unwrap(),
            "^011231231231233322test^10abc^21xyz"
        );
        assert_eq!(
            parse("https://a/01/12312312312333/22/test/10/abc/21/xyz#frag")
                .unwrap(),
            "^011231231231233322test^10abc^21xyz"
        );
        assert_eq!(
            parse("https://a/stem/00/006141411234567890?99=ABC#frag")
                .unwrap(),
            "^0000614141123456789099ABC"
        );
    }

    #[test]
    fn dl_specification_examples() {
        assert_eq!(
            parse("https://id.gs1.org/01/09520123456788").unwrap(),
            "^0109520123456788"
        );
        assert_eq!(
            parse("https://id.gs1.org/01/09520123456788/22/2A").unwrap(),
            "^0109520123456788222A"
        );
        assert_eq!(
            parse("https://id.gs1.org/01/09520123456788/10/ABC123").unwrap(),
            "^010952012345678810ABC123"
        );
        assert_eq!(
            parse("https://id.gs1.org/01/09520123456788/21/12345").unwrap(),
            "^01095201234567882112345"
        );
        assert_eq!(
            parse(
                "https://id.gs1.org/01/09520123456788/10/ABC1/21/12345?17=180426"
            )
            .unwrap(),
            "^010952012345678810ABC1^2112345^17180426"
        );
        assert_eq!(
            parse("https://id.gs1.org/01/09520123456788?3103=000195").unwrap(),
            "^01095201234567883103000195"
        );
        assert_eq!(
            parse(
                "https://example.com/01/09520123456788?3103=000195&3922=0299&17=201225"
            )
            .unwrap(),
            "^0109520123456788310300019539220299^17201225"
        );
        assert_eq!(
            parse(
                "https://id.gs1.org/01/09520123456788?17=201225&3103=000195&3922=0299"
            )
            .unwrap(),
            "^010952012345678817201225310300019539220299"
        );
        assert_eq!(
            parse("https://id.gs1.org/00/952012345678912345").unwrap(),
            "^00952012345678912345"
        );
        assert_eq!(
            parse(
                "https://id.gs1.org/00/952012345678912345?02=09520123456788&37=25&10=ABC123"
            )
            .unwrap(),
            "^0095201234567891234502095201234567883725^10ABC123"
        );
        assert_eq!(
            parse("https://id.gs1.org/414/9520123456788").unwrap(),
            "^4149520123456788"
        );
        assert_eq!(
            parse("https://id.gs1.org/414/9520123456788/254/32a%2Fb").unwrap(),
            "^414952012345678825432a/b"
        );
    }

    #[test]
    fn misplaced_qualifiers_and_duplicates() {
        // (10) slots into [01] as a qualifier, so it belongs in the path.
        assert_eq!(
            parse_err("https://example.com/01/09520123456788?10=ABC123"),
            ErrorKind::AiShouldBeInPathInfo
        );
        // With the (235) qualifier occupying the path, (10) no longer fits.
        assert_eq!(
            parse("https://id.gs1.org/01/09520123456788/235/XYZ?10=ABC123")
                .unwrap(),
            "^0109520123456788235XYZ^10ABC123"
        );
        for uri in [
            "https://id.gs1.org/01/09520123456788/10/ABC123?99=XYZ789&01=09520123456788",
            "https://id.gs1.org/01/09520123456788/10/ABC123?99=XYZ789&10=ABC123",
            "https://id.gs1.org/01/09520123456788/10/ABC123?99=XYZ789&99=XYZ789",
        ] {
            assert_eq!(parse_err(uri), ErrorKind::DuplicateAi, "{}", uri);
        }
    }

    #[test]
    fn unknown_ais_in_dl_uris() {
        assert_eq!(
            parse_err("https://example.com/01/09520123456788?99=XYZ&89=ABC123"),
            ErrorKind::UnknownAiInQueryParams
        );
        // Vivified unknown AIs are not permitted data attributes...
        let permit = |eng: &mut Engine| eng.set_permit_unknown_ais(true);
        assert_eq!(
            parse_with(
                "https://example.com/01/09520123456788?99=XYZ&89=ABC123",
                permit
            )
            .unwrap_err()
            .kind(),
            ErrorKind::AiIsNotValidDataAttribute
        );
        // ... unless that validation is explicitly disabled.
        assert_eq!(
            parse_with(
                "https://example.com/01/09520123456788?99=XYZ&89=ABC123",
                |eng| {
                    eng.set_permit_unknown_ais(true);
                    eng.set_validation_enabled(
                        Validation::UnknownAiNotDlAttr,
                        false,
                    )
                    .unwrap();
                },
            )
            .unwrap(),
            "^010952012345678899XYZ^89ABC123"
        );
    }

    fn generate(
        ai_data: &str,
        stem: Option<&str>,
        setup: impl Fn(&mut Engine),
    ) -> Result<String, Gs1Error> {
        let mut eng = Engine::new();
        setup(&mut eng);
        elements::parse_ai_data(&mut eng, ai_data).unwrap();
        generate_dl_uri(&mut eng, stem)
    }

    #[test]
    fn generator_basic() {
        assert_eq!(
            generate("(01)12312312312326(21)abc123", None, |_| ()).unwrap(),
            "https://id.gs1.org/01/12312312312326/21/abc123"
        );
        assert_eq!(
            generate(
                "(01)12312312312326(21)abc123",
                Some("https://example.com"),
                |_| ()
            )
            .unwrap(),
            "https://example.com/01/12312312312326/21/abc123"
        );
        // A trailing slash on the stem is absorbed.
        assert_eq!(
            generate(
                "(01)12312312312326(21)abc123",
                Some("https://example.com/"),
                |_| ()
            )
            .unwrap(),
            "https://example.com/01/12312312312326/21/abc123"
        );
        assert_eq!(
            generate(
                "(01)12312312312326(22)ABC(10)DEF(21)GHI",
                Some("https://example.com"),
                |_| ()
            )
            .unwrap(),
            "https://example.com/01/12312312312326/22/ABC/10/DEF/21/GHI"
        );
        assert_eq!(
            generate(
                "(01)12312312312326(22)ABC(10)DEF(21)GHI(95)INT",
                Some("https://example.com"),
                |_| ()
            )
            .unwrap(),
            "https://example.com/01/12312312312326/22/ABC/10/DEF/21/GHI?95=INT"
        );
        // Extraction order does not dictate path order.
        assert_eq!(
            generate(
                "(21)XYZ(01)12312312312333(10)ABC123(99)XYZ",
                Some("https://example.com"),
                |_| ()
            )
            .unwrap(),
            "https://example.com/01/12312312312333/10/ABC123/21/XYZ?99=XYZ"
        );
        assert_eq!(
            generate("(10)ABC123(99)XYZ", None, |_| ()).unwrap_err().kind(),
            ErrorKind::CannotCreateDlUriWithoutPrimaryKeyAi
        );
    }

    #[test]
    fn generator_escaping() {
        // "+" must be escaped in both modes; space would become "+" only in
        // the query string.
        assert_eq!(
            generate(
                "(01)12312312312333(10)ABC+123(99)XYZ+QWERTY",
                Some("https://example.com"),
                |_| ()
            )
            .unwrap(),
            "https://example.com/01/12312312312333/10/ABC%2B123?99=XYZ%2BQWERTY"
        );
    }

    #[test]
    fn generator_multiple_candidate_keys() {
        // The first extracted primary key wins; the rest demote to
        // attributes.
        assert_eq!(
            generate(
                "(8017)795260646688514634(99)000001(253)9526064000028000001",
                Some("https://example.com"),
                |_| ()
            )
            .unwrap(),
            "https://example.com/8017/795260646688514634?99=000001&253=9526064000028000001"
        );
        assert_eq!(
            generate(
                "(253)9526064000028000001(99)000001(8017)795260646688514634",
                Some("https://example.com"),
                |_| ()
            )
            .unwrap(),
            "https://example.com/253/9526064000028000001?99=000001&8017=795260646688514634"
        );
        assert_eq!(
            generate(
                "(98)ABC(253)9526064000028000001(99)000001(8017)795260646688514634",
                Some("https://example.com"),
                |_| ()
            )
            .unwrap(),
            "https://example.com/253/9526064000028000001?98=ABC&99=000001&8017=795260646688514634"
        );
        // Fixed-length attributes are emitted ahead of variable-length.
        assert_eq!(
            generate(
                "(253)9526064000028000001(99)000001(01)12312312312326(10)DEF(95)INT",
                Some("https://example.com"),
                |_| ()
            )
            .unwrap(),
            "https://example.com/253/9526064000028000001?01=12312312312326&99=000001&10=DEF&95=INT"
        );
    }

    #[test]
    fn generator_deduplicates_ais() {
        assert_eq!(
            generate(
                "(01)12312312312326(01)12312312312326(10)ABC123(99)XYZ789",
                Some("https://example.com"),
                |_| ()
            )
            .unwrap(),
            "https://example.com/01/12312312312326/10/ABC123?99=XYZ789"
        );
        assert_eq!(
            generate(
                "(01)12312312312326(10)ABC123(10)ABC123(99)XYZ789",
                Some("https://example.com"),
                |_| ()
            )
            .unwrap(),
            "https://example.com/01/12312312312326/10/ABC123?99=XYZ789"
        );
        assert_eq!(
            generate(
                "(01)12312312312326(10)ABC123(99)XYZ789(99)XYZ789",
                Some("https://example.com"),
                |_| ()
            )
            .unwrap(),
            "https://example.com/01/12312312312326/10/ABC123?99=XYZ789"
        );
    }

    #[test]
    fn generator_rejects_invalid_data_attributes() {
        // (8200) is not a valid DL data attribute.
        assert_eq!(
            generate(
                "(01)12312312312326(99)000001(8200)http://example.com(95)INT",
                Some("https://example.com"),
                |_| ()
            )
            .unwrap_err()
            .kind(),
            ErrorKind::AiIsNotValidDataAttribute
        );
        // (22) occupies the path, leaving (235) as an attribute, which it
        // may not be.
        assert_eq!(
            generate(
                "(01)12312312312326(235)TPX9526064(99)000001(22)ABC(95)INT",
                Some("https://example.com"),
                |_| ()
            )
            .unwrap_err()
            .kind(),
            ErrorKind::AiIsNotValidDataAttribute
        );
        assert_eq!(
            generate(
                "(01)12312312312326(22)ABC(10)DEF(99)000001(235)TPX9526064(95)INT",
                Some("https://example.com"),
                |_| ()
            )
            .unwrap_err()
            .kind(),
            ErrorKind::AiIsNotValidDataAttribute
        );
    }

    #[test]
    fn generator_unknown_ais() {
        let permit = |eng: &mut Engine| eng.set_permit_unknown_ais(true);
        assert_eq!(
            generate(
                "(01)12312312312326(99)000001(89)XXX(95)INT",
                Some("https://example.com"),
                permit
            )
            .unwrap_err()
            .kind(),
            ErrorKind::AiIsNotValidDataAttribute
        );
        assert_eq!(
            generate(
                "(01)12312312312326(99)000001(89)XXX(95)INT",
                Some("https://example.com"),
                |eng| {
                    eng.set_permit_unknown_ais(true);
                    eng.set_validation_enabled(
                        Validation::UnknownAiNotDlAttr,
                        false,
                    )
                    .unwrap();
                },
            )
            .unwrap(),
            "https://example.com/01/12312312312326?99=000001&89=XXX&95=INT"
        );
    }
}
