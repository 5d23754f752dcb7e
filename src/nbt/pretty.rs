use crate::nbt::value::{NamedTag, TagValue};
use std::fmt::Write;

/// Renders a tag tree one tag per line, children indented by tabs and
/// wrapped in braces.
pub fn pretty_tree(tag: &NamedTag) -> String {
    let mut out = String::new();
    write_tag(&mut out, Some(&tag.name), &tag.value, 0);
    out
}

fn write_tag(out: &mut String, name: Option<&str>, value: &TagValue, indent: usize) {
    push_indent(out, indent);
    out.push_str(value.kind().name());
    if let Some(name) = name.filter(|name| !name.is_empty()) {
        let _ = write!(out, "({})", quote(name));
    }
    out.push_str(": ");
    out.push_str(&summary(value));

    match value {
        TagValue::List(list) if !list.is_empty() => {
            open_block(out, indent);
            for item in list.iter() {
                out.push('\n');
                write_tag(out, None, item, indent + 1);
            }
            close_block(out, indent);
        }
        TagValue::Compound(compound) if !compound.is_empty() => {
            open_block(out, indent);
            for child in compound {
                out.push('\n');
                write_tag(out, Some(&child.name), &child.value, indent + 1);
            }
            close_block(out, indent);
        }
        _ => {}
    }
}

fn push_indent(out: &mut String, indent: usize) {
    out.extend(std::iter::repeat('\t').take(indent));
}

fn open_block(out: &mut String, indent: usize) {
    out.push('\n');
    push_indent(out, indent);
    out.push('{');
}

fn close_block(out: &mut String, indent: usize) {
    out.push('\n');
    push_indent(out, indent);
    out.push('}');
}

/// Singular for counts of zero and one.
fn plural(count: usize, one: &str, many: &str) -> String {
    format!("{count} {}", if count > 1 { many } else { one })
}

fn summary(value: &TagValue) -> String {
    match value {
        TagValue::End => String::new(),
        TagValue::Byte(v) => v.to_string(),
        TagValue::Short(v) => v.to_string(),
        TagValue::Int(v) => v.to_string(),
        TagValue::Long(v) => v.to_string(),
        TagValue::Float(v) => float_string(*v as f64, v.to_string()),
        TagValue::Double(v) => float_string(*v, v.to_string()),
        TagValue::ByteArray(values) => format!("[{}]", plural(values.len(), "byte", "bytes")),
        TagValue::String(v) => quote(v),
        TagValue::List(list) => format!("{} entries of type {}", list.len(), list.element_kind),
        TagValue::Compound(compound) => plural(compound.len(), "Entry", "Entries"),
        TagValue::IntArray(values) => format!("[{}]", plural(values.len(), "int", "ints")),
        TagValue::LongArray(values) => format!("[{}]", plural(values.len(), "long", "longs")),
    }
}

fn float_string(value: f64, rendered: String) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value == f64::INFINITY {
        "inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        rendered
    }
}

/// Double-quotes `text`, escaping quotes, backslashes and control characters.
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nbt::value::{Compound, TagKind, TagList};

    #[test]
    fn renders_nested_tree() {
        let mut level = Compound::new();
        level.insert("name", "Bananrama");
        let mut scores = TagList::new(TagKind::Int);
        scores.push(1).unwrap();
        scores.push(2).unwrap();
        level.insert("scores", scores);
        level.insert("empty", Compound::new());

        let rendered = pretty_tree(&NamedTag::new("Level", level));
        let expected = "TAG_Compound(\"Level\"): 3 Entries\n\
                        {\n\
                        \tTAG_String(\"name\"): \"Bananrama\"\n\
                        \tTAG_List(\"scores\"): 2 entries of type TAG_Int\n\
                        \t{\n\
                        \t\tTAG_Int: 1\n\
                        \t\tTAG_Int: 2\n\
                        \t}\n\
                        \tTAG_Compound(\"empty\"): 0 Entry\n\
                        }";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn non_finite_floats_use_short_names() {
        assert_eq!(summary(&TagValue::Float(f32::NAN)), "nan");
        assert_eq!(summary(&TagValue::Double(f64::NEG_INFINITY)), "-inf");
        assert_eq!(summary(&TagValue::Double(f64::INFINITY)), "inf");
        assert_eq!(summary(&TagValue::Float(0.5)), "0.5");
    }

    #[test]
    fn summaries_pluralise_only_above_one() {
        assert_eq!(summary(&TagValue::ByteArray(vec![])), "[0 byte]");
        assert_eq!(summary(&TagValue::IntArray(vec![7])), "[1 int]");
        assert_eq!(summary(&TagValue::LongArray(vec![1, 2])), "[2 longs]");
        assert_eq!(summary(&TagValue::Compound(Compound::new())), "0 Entry");
        assert_eq!(
            summary(&TagValue::List(TagList::new(TagKind::Short))),
            "0 entries of type TAG_Short"
        );
        let mut one = TagList::new(TagKind::Byte);
        one.push(1i8).unwrap();
        assert_eq!(summary(&TagValue::List(one)), "1 entries of type TAG_Byte");
    }

    #[test]
    fn quote_escapes_control_characters() {
        assert_eq!(quote("a\"b\\c\n\u{1}"), "\"a\\\"b\\\\c\\n\\u0001\"");
    }
}
