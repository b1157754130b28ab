//! `{{TOKEN}}` placeholder substitution.
//!
//! Rendering is a single left-to-right scan over an immutable input: every
//! replacement value is copied into the output verbatim and never re-scanned,
//! so values may contain any character (including `/`, `&`, `\` and even
//! `{{OTHER}}`) without being interpreted.
use std::collections::BTreeMap;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Substitute every `{{NAME}}` whose `NAME` is a key of `placeholders`.
///
/// Tokens without a matching key are left verbatim.  Text that merely looks
/// like the start of a token (an unmatched `{{`) is copied unchanged.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use wsl_setup::resources::template::render;
///
/// let mut values = BTreeMap::new();
/// values.insert("VAL".to_string(), "2".to_string());
/// assert_eq!(render("B={{VAL}}", &values), "B=2");
/// assert_eq!(render("{{UNDEFINED}}", &values), "{{UNDEFINED}}");
/// ```
#[must_use]
pub fn render(template: &str, placeholders: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some((before, after_open)) = rest.split_once(OPEN) {
        out.push_str(before);

        let Some((name, after_close)) = after_open.split_once(CLOSE) else {
            out.push_str(OPEN);
            out.push_str(after_open);
            return out;
        };

        match placeholders.get(name) {
            Some(value) if is_token_name(name) => {
                out.push_str(value);
                rest = after_close;
            }
            _ => {
                // Emit only the opening brace pair so a token starting inside
                // this span (e.g. `{{ {{A}}`) is still found.
                out.push_str(OPEN);
                rest = after_open;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Names of the well-formed tokens left unresolved by `placeholders`, in
/// order of first appearance.
#[must_use]
pub fn unresolved_tokens(template: &str, placeholders: &BTreeMap<String, String>) -> Vec<String> {
    let mut missing: Vec<String> = Vec::new();
    for name in token_names(template) {
        if !placeholders.contains_key(name) && !missing.iter().any(|m| m == name) {
            missing.push(name.to_string());
        }
    }
    missing
}

/// Every well-formed token name referenced by `template`.
pub fn token_names(template: &str) -> impl Iterator<Item = &str> {
    template.split(OPEN).skip(1).filter_map(|chunk| {
        let (name, _) = chunk.split_once(CLOSE)?;
        is_token_name(name).then_some(name)
    })
}

/// A token name is a non-empty run of ASCII letters, digits, and `_`.
fn is_token_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn replaces_every_occurrence() {
        let p = values(&[("USER", "alice")]);
        assert_eq!(
            render("home=/home/{{USER}} owner={{USER}}", &p),
            "home=/home/alice owner=alice"
        );
    }

    #[test]
    fn unknown_token_passes_through() {
        let p = values(&[("KNOWN", "x")]);
        assert_eq!(
            render("a={{KNOWN}} b={{UNDEFINED}}", &p),
            "a=x b={{UNDEFINED}}"
        );
    }

    #[test]
    fn path_separators_and_sed_metacharacters_are_literal() {
        let p = values(&[("VHD", r"/mnt/c/Users/me/disk.vhdx"), ("AMP", r"a&b\1|c")]);
        assert_eq!(
            render("disk={{VHD}} raw={{AMP}}", &p),
            r"disk=/mnt/c/Users/me/disk.vhdx raw=a&b\1|c"
        );
    }

    #[test]
    fn replacement_values_are_not_rescanned() {
        let p = values(&[("A", "{{B}}"), ("B", "boom")]);
        assert_eq!(render("{{A}}", &p), "{{B}}");
    }

    #[test]
    fn self_referencing_value_does_not_loop() {
        let p = values(&[("A", "{{A}}{{A}}")]);
        assert_eq!(render("{{A}}", &p), "{{A}}{{A}}");
    }

    #[test]
    fn unterminated_token_is_copied() {
        let p = values(&[("A", "1")]);
        assert_eq!(render("x={{A", &p), "x={{A");
        assert_eq!(render("{{A}} and {{", &p), "1 and {{");
    }

    #[test]
    fn token_after_stray_open_braces_is_found() {
        let p = values(&[("A", "1")]);
        assert_eq!(render("{{ {{A}}", &p), "{{ 1");
    }

    #[test]
    fn whitespace_inside_braces_is_not_a_token() {
        let p = values(&[("A", "1"), (" A ", "2")]);
        assert_eq!(render("{{ A }}", &p), "{{ A }}");
    }

    #[test]
    fn rendering_is_deterministic() {
        let p = values(&[("VAL", "2"), ("HOME", "/home/me")]);
        let template = "B={{VAL}}\npath={{HOME}}/.ssh\n{{MISSING}}\n";
        assert_eq!(render(template, &p), render(template, &p));
    }

    #[test]
    fn empty_template_renders_empty() {
        assert_eq!(render("", &values(&[("A", "1")])), "");
    }

    #[test]
    fn unresolved_tokens_lists_each_missing_name_once() {
        let p = values(&[("A", "1")]);
        assert_eq!(
            unresolved_tokens("{{A}} {{B}} {{C}} {{B}} {{ bad }}", &p),
            vec!["B".to_string(), "C".to_string()]
        );
    }

    #[test]
    fn token_names_skips_malformed() {
        let names: Vec<&str> = token_names("{{A}} {{}} {{b-c}} {{D_1}}").collect();
        assert_eq!(names, vec!["A", "D_1"]);
    }
}
