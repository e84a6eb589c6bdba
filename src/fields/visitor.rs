//! # Field Visitors
//!
//! [`FieldVisitor`] has one callback per field kind. Every callback defaults
//! to [`FieldVisitor::visit_field`], so a visitor overrides only the kinds
//! it cares about. [`Field::walk`] drives a visitor over a whole tree.
//!
//! [`SchemaPrinter`] renders a tree, one field per line:
//!
//! ```text
//! <root>
//!   px: f64
//!   hits: vector<Hit> [collection]
//!     _0: Hit [record]
//!       energy: f64
//!   pair: variant<i32,string> [variant of 2]
//! ```

use std::fmt::Write;

use super::Field;

pub trait FieldVisitor {
    fn visit_field(&mut self, field: &Field, level: usize);

    fn visit_root(&mut self, field: &Field, level: usize) {
        self.visit_field(field, level);
    }

    fn visit_scalar(&mut self, field: &Field, level: usize) {
        self.visit_field(field, level);
    }

    fn visit_string(&mut self, field: &Field, level: usize) {
        self.visit_field(field, level);
    }

    fn visit_vector(&mut self, field: &Field, level: usize) {
        self.visit_field(field, level);
    }

    fn visit_array(&mut self, field: &Field, level: usize) {
        self.visit_field(field, level);
    }

    fn visit_record(&mut self, field: &Field, level: usize) {
        self.visit_field(field, level);
    }

    fn visit_variant(&mut self, field: &Field, level: usize) {
        self.visit_field(field, level);
    }
}

/// Renders a field tree as indented text.
#[derive(Debug)]
pub struct SchemaPrinter {
    out: String,
    indent: usize,
}

impl Default for SchemaPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaPrinter {
    pub fn new() -> Self {
        Self::with_indent(2)
    }

    pub fn with_indent(indent: usize) -> Self {
        Self {
            out: String::new(),
            indent,
        }
    }

    /// Renders `field` and its descendants.
    pub fn render(field: &Field) -> String {
        let mut printer = Self::new();
        field.walk(&mut printer);
        printer.finish()
    }

    pub fn finish(self) -> String {
        self.out
    }

    fn line(&mut self, field: &Field, level: usize, note: Option<String>) {
        let _ = write!(
            self.out,
            "{:width$}{}: {}",
            "",
            field.name(),
            field.type_name(),
            width = level * self.indent
        );
        if let Some(note) = note {
            let _ = write!(self.out, " [{note}]");
        }
        self.out.push('\n');
    }
}

impl FieldVisitor for SchemaPrinter {
    fn visit_field(&mut self, field: &Field, level: usize) {
        self.line(field, level, None);
    }

    fn visit_root(&mut self, _field: &Field, level: usize) {
        let _ = writeln!(self.out, "{:width$}<root>", "", width = level * self.indent);
    }

    fn visit_vector(&mut self, field: &Field, level: usize) {
        self.line(field, level, Some("collection".to_string()));
    }

    fn visit_array(&mut self, field: &Field, level: usize) {
        self.line(field, level, Some(format!("{} repetitions", field.repetitions())));
    }

    fn visit_record(&mut self, field: &Field, level: usize) {
        self.line(field, level, Some("record".to_string()));
    }

    fn visit_variant(&mut self, field: &Field, level: usize) {
        self.line(field, level, Some(format!("variant of {}", field.sub_fields().len())));
    }
}
