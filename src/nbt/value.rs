use crate::error::{Error, Result};
use std::fmt;

/// Wire ids of the tag kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TagKind {
    End = 0,
    Byte = 1,
    Short = 2,
    Int = 3,
    Long = 4,
    Float = 5,
    Double = 6,
    ByteArray = 7,
    String = 8,
    List = 9,
    Compound = 10,
    IntArray = 11,
    LongArray = 12,
}

impl TagKind {
    pub const ALL: [TagKind; 13] = [
        TagKind::End,
        TagKind::Byte,
        TagKind::Short,
        TagKind::Int,
        TagKind::Long,
        TagKind::Float,
        TagKind::Double,
        TagKind::ByteArray,
        TagKind::String,
        TagKind::List,
        TagKind::Compound,
        TagKind::IntArray,
        TagKind::LongArray,
    ];

    pub fn from_id(id: u8) -> Result<Self> {
        Self::ALL
            .get(id as usize)
            .copied()
            .ok_or_else(|| Error::format(format!("unknown tag kind id {id}")))
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            TagKind::End => "TAG_End",
            TagKind::Byte => "TAG_Byte",
            TagKind::Short => "TAG_Short",
            TagKind::Int => "TAG_Int",
            TagKind::Long => "TAG_Long",
            TagKind::Float => "TAG_Float",
            TagKind::Double => "TAG_Double",
            TagKind::ByteArray => "TAG_Byte_Array",
            TagKind::String => "TAG_String",
            TagKind::List => "TAG_List",
            TagKind::Compound => "TAG_Compound",
            TagKind::IntArray => "TAG_Int_Array",
            TagKind::LongArray => "TAG_Long_Array",
        }
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TagValue {
    End,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(TagList),
    Compound(Compound),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl TagValue {
    pub fn kind(&self) -> TagKind {
        match self {
            TagValue::End => TagKind::End,
            TagValue::Byte(_) => TagKind::Byte,
            TagValue::Short(_) => TagKind::Short,
            TagValue::Int(_) => TagKind::Int,
            TagValue::Long(_) => TagKind::Long,
            TagValue::Float(_) => TagKind::Float,
            TagValue::Double(_) => TagKind::Double,
            TagValue::ByteArray(_) => TagKind::ByteArray,
            TagValue::String(_) => TagKind::String,
            TagValue::List(_) => TagKind::List,
            TagValue::Compound(_) => TagKind::Compound,
            TagValue::IntArray(_) => TagKind::IntArray,
            TagValue::LongArray(_) => TagKind::LongArray,
        }
    }

    pub fn as_byte(&self) -> Option<i8> {
        match self {
            TagValue::Byte(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_short(&self) -> Option<i16> {
        match self {
            TagValue::Short(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            TagValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            TagValue::Long(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            TagValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            TagValue::Double(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TagValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&TagList> {
        match self {
            TagValue::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_compound(&self) -> Option<&Compound> {
        match self {
            TagValue::Compound(compound) => Some(compound),
            _ => None,
        }
    }

    pub fn as_compound_mut(&mut self) -> Option<&mut Compound> {
        match self {
            TagValue::Compound(compound) => Some(compound),
            _ => None,
        }
    }
}

impl From<i8> for TagValue {
    fn from(value: i8) -> Self {
        TagValue::Byte(value)
    }
}

impl From<i16> for TagValue {
    fn from(value: i16) -> Self {
        TagValue::Short(value)
    }
}

impl From<i32> for TagValue {
    fn from(value: i32) -> Self {
        TagValue::Int(value)
    }
}

impl From<i64> for TagValue {
    fn from(value: i64) -> Self {
        TagValue::Long(value)
    }
}

impl From<f32> for TagValue {
    fn from(value: f32) -> Self {
        TagValue::Float(value)
    }
}

impl From<f64> for TagValue {
    fn from(value: f64) -> Self {
        TagValue::Double(value)
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        TagValue::String(value.to_string())
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        TagValue::String(value)
    }
}

impl From<TagList> for TagValue {
    fn from(value: TagList) -> Self {
        TagValue::List(value)
    }
}

impl From<Compound> for TagValue {
    fn from(value: Compound) -> Self {
        TagValue::Compound(value)
    }
}

/// A tag together with the name it carries inside its parent compound or
/// at the top of a document. List members are bare [`TagValue`]s.
#[derive(Clone, Debug, PartialEq)]
pub struct NamedTag {
    pub name: String,
    pub value: TagValue,
}

impl NamedTag {
    pub fn new(name: impl Into<String>, value: impl Into<TagValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn kind(&self) -> TagKind {
        self.value.kind()
    }
}

/// Homogeneous list. The fields are public, so the element-kind invariant
/// is checked again when the list is encoded.
#[derive(Clone, Debug, PartialEq)]
pub struct TagList {
    pub element_kind: TagKind,
    pub items: Vec<TagValue>,
}

impl TagList {
    pub fn new(element_kind: TagKind) -> Self {
        Self {
            element_kind,
            items: Vec::new(),
        }
    }

    /// Builds a list from members that must all share `element_kind`.
    pub fn from_items(element_kind: TagKind, items: Vec<TagValue>) -> Result<Self> {
        let list = Self {
            element_kind,
            items,
        };
        list.check_homogeneous()?;
        Ok(list)
    }

    pub fn push(&mut self, value: impl Into<TagValue>) -> Result<()> {
        let value = value.into();
        if value.kind() != self.element_kind {
            return Err(Error::schema(format!(
                "expected {} in list, not {}",
                self.element_kind,
                value.kind()
            )));
        }
        self.items.push(value);
        Ok(())
    }

    pub fn check_homogeneous(&self) -> Result<()> {
        match self
            .items
            .iter()
            .find(|item| item.kind() != self.element_kind)
        {
            Some(item) => Err(Error::schema(format!(
                "expected {} in list, not {}",
                self.element_kind,
                item.kind()
            ))),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TagValue> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TagValue> {
        self.items.iter()
    }
}

impl Default for TagList {
    fn default() -> Self {
        Self::new(TagKind::End)
    }
}

/// Ordered named children. Names are not required to be unique: lookups see
/// the first match and assignment replaces the first match or appends.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Compound {
    entries: Vec<NamedTag>,
}

impl Compound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<NamedTag>) -> Self {
        Self { entries }
    }

    pub fn into_entries(self) -> Vec<NamedTag> {
        self.entries
    }

    pub fn entries(&self) -> &[NamedTag] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&TagValue> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.value)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut TagValue> {
        self.entries
            .iter_mut()
            .find(|entry| entry.name == name)
            .map(|entry| &mut entry.value)
    }

    /// Replaces the first child called `name`, or appends a new one.
    /// Returns the value that was replaced.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<TagValue>) -> Option<TagValue> {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => Some(std::mem::replace(&mut entry.value, value)),
            None => {
                self.entries.push(NamedTag { name, value });
                None
            }
        }
    }

    /// Appends without looking for an existing child of the same name.
    pub fn push(&mut self, tag: NamedTag) {
        self.entries.push(tag);
    }

    pub fn remove(&mut self, name: &str) -> Option<TagValue> {
        let position = self.entries.iter().position(|entry| entry.name == name)?;
        Some(self.entries.remove(position).value)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.name == name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NamedTag> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<NamedTag> for Compound {
    fn from_iter<I: IntoIterator<Item = NamedTag>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Compound {
    type Item = &'a NamedTag;
    type IntoIter = std::slice::Iter<'a, NamedTag>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
