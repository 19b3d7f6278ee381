//! Control-file rendering.
//!
//! NAMD and GOMC control files are produced from user templates in which
//! placeholder tokens (`NAMD_Run_Steps`, `x_dim_box_0`, `Restart_Checkpoint_file`, ...)
//! stand for per-turn values. The orchestrator only decides what each token
//! is bound to; this module does the text work.
//!
//! Substitution is a single left-to-right pass that tries longer tokens
//! first, so a value is never itself rescanned for tokens and a token that
//! contains a shorter one is matched whole.

use crate::error::{HybridError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Token values and template lines to drop for one control file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlBindings {
    values: BTreeMap<String, String>,
    removed_directives: Vec<(String, String)>,
}

impl ControlBindings {
    /// Empty bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `token` to `value`, replacing an earlier binding.
    pub fn set(&mut self, token: &str, value: impl Into<String>) -> &mut Self {
        self.values.insert(token.to_string(), value.into());
        self
    }

    /// Drops every template line whose first two fields are `keyword value`.
    pub fn remove_directive(&mut self, keyword: &str, value: &str) -> &mut Self {
        self.removed_directives
            .push((keyword.to_string(), value.to_string()));
        self
    }

    /// Value bound to `token`, if any.
    pub fn get(&self, token: &str) -> Option<&str> {
        self.values.get(token).map(String::as_str)
    }

    /// Number of bound tokens.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no token is bound.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn drops_line(&self, line: &str) -> bool {
        let mut fields = line.split_whitespace();
        match (fields.next(), fields.next()) {
            (Some(keyword), Some(value)) => self
                .removed_directives
                .iter()
                .any(|(k, v)| k == keyword && v == value),
            _ => false,
        }
    }
}

/// Renders `template` with `bindings`.
///
/// # Examples
///
/// ```
/// use hybrid_mdmc::template_generator::{render, ControlBindings};
///
/// let mut bindings = ControlBindings::new();
/// bindings.set("x_dim_box", "25.0").set("x_origin_box", "12.5");
/// bindings.remove_directive("binVelocities", "1");
///
/// let out = render("cellBasisVector1 x_dim_box 0 0\ncellOrigin x_origin_box\nbinVelocities 1 vel\n", &bindings);
/// assert_eq!(out, "cellBasisVector1 25.0 0 0\ncellOrigin 12.5\n");
/// ```
pub fn render(template: &str, bindings: &ControlBindings) -> String {
    let mut tokens: Vec<(&str, &str)> = bindings
        .values
        .iter()
        .filter(|(token, _)| !token.is_empty())
        .map(|(t, v)| (t.as_str(), v.as_str()))
        .collect();
    tokens.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));

    let mut out = String::with_capacity(template.len());
    for line in template.split_inclusive('\n') {
        if bindings.drops_line(line) {
            continue;
        }
        substitute_into(&mut out, line, &tokens);
    }
    out
}

fn substitute_into(out: &mut String, text: &str, tokens: &[(&str, &str)]) {
    let mut rest = text;
    'scan: while !rest.is_empty() {
        for (token, value) in tokens {
            if rest.starts_with(token) {
                out.push_str(value);
                rest = &rest[token.len()..];
                continue 'scan;
            }
        }
        let mut chars = rest.chars();
        if let Some(ch) = chars.next() {
            out.push(ch);
        }
        rest = chars.as_str();
    }
}

/// Reads a template file, renders it and writes the control file.
///
/// # Errors
///
/// [`HybridError::Template`] when the template cannot be read.
pub fn render_file(template_path: &Path, bindings: &ControlBindings, output_path: &Path) -> Result<()> {
    let template = fs::read_to_string(template_path).map_err(|e| {
        HybridError::Template(format!("cannot read {}: {}", template_path.display(), e))
    })?;
    fs::write(output_path, render(&template, bindings))?;
    Ok(())
}

/// Formats a real number for a control file; integral values keep a `.0`.
///
/// ```
/// use hybrid_mdmc::template_generator::format_real;
///
/// assert_eq!(format_real(25.0), "25.0");
/// assert_eq!(format_real(12.75), "12.75");
/// ```
pub fn format_real(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longer_token_matched_first() {
        let mut bindings = ControlBindings::new();
        bindings.set("x_dim_box", "A").set("x_dim_box_0", "B");
        assert_eq!(render("x_dim_box_0 x_dim_box", &bindings), "B A");
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let mut bindings = ControlBindings::new();
        bindings
            .set("pdb_box_file", "../GOMC/0000000001/xsc_file.pdb")
            .set("xsc_file", "WRONG");
        assert_eq!(
            render("structure pdb_box_file\n", &bindings),
            "structure ../GOMC/0000000001/xsc_file.pdb\n"
        );
    }

    #[test]
    fn test_directive_removal_needs_both_fields() {
        let mut bindings = ControlBindings::new();
        bindings.remove_directive("binCoordinates", "1");
        let template = "binCoordinates 1 coor_box_1_file\nbinCoordinates 0 coor_box_0_file\nbinCoordinates\n";
        assert_eq!(
            render(template, &bindings),
            "binCoordinates 0 coor_box_0_file\nbinCoordinates\n"
        );
    }

    #[test]
    fn test_unbound_text_and_unicode_pass_through() {
        let bindings = ControlBindings::new();
        assert!(bindings.is_empty());
        assert_eq!(render("temperature 300 # Å\n", &bindings), "temperature 300 # Å\n");
    }

    #[test]
    fn test_render_file_reports_missing_template() {
        let dir = tempfile::tempdir().unwrap();
        let err = render_file(
            &dir.path().join("missing.conf"),
            &ControlBindings::new(),
            &dir.path().join("in.conf"),
        )
        .unwrap_err();
        assert!(matches!(err, HybridError::Template(_)));
    }
}
