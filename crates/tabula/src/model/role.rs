//! Data roles for item models.
//!
//! Roles define which facet of a cell is being requested. Display, Edit and
//! Decoration route through the owning column; SortValue through the column's
//! sort transform; Foreground and Background through the rule chain.
//! RowIdentity and RowIndex expose the stored row reference and its storage
//! position, independent of any proxy's reordering.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::row::RowRef;

/// The facet of a cell a query asks for.
///
/// Row-facing roles ([`RowIdentity`](Self::RowIdentity) and
/// [`RowIndex`](Self::RowIndex)) pass through proxies untouched, so a view
/// can always reach the stored row behind a displayed position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemRole {
    Display,
    /// Auxiliary visual such as an icon name, read from the column's
    /// decoration field.
    Decoration,
    /// Answered like `Display`; editors start from this text.
    Edit,
    ToolTip,
    TextAlignment,
    Background,
    Foreground,
    /// Default width of a column, asked of the horizontal header.
    SizeHint,
    /// The value a sorting proxy compares.
    SortValue,
    /// `ItemData::Row` holding the stored row.
    RowIdentity,
    /// `ItemData::Int` holding the storage position.
    RowIndex,
    /// Application-defined roles. The model answers them with `None`.
    User(u32),
}

impl ItemRole {
    /// Roles re-announced by a forced repaint.
    pub const REPAINT: [ItemRole; 3] = [ItemRole::Display, ItemRole::Foreground, ItemRole::Background];
}

/// Placement of text inside its cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextAlignment {
    pub horizontal: HorizontalAlignment,
    pub vertical: VerticalAlignment,
}

impl TextAlignment {
    pub fn new(horizontal: HorizontalAlignment, vertical: VerticalAlignment) -> Self {
        Self { horizontal, vertical }
    }

    const fn centered_vertically(horizontal: HorizontalAlignment) -> Self {
        Self {
            horizontal,
            vertical: VerticalAlignment::Center,
        }
    }

    /// The column default.
    pub const fn left() -> Self {
        Self::centered_vertically(HorizontalAlignment::Left)
    }

    pub const fn center() -> Self {
        Self::centered_vertically(HorizontalAlignment::Center)
    }

    /// Usual for numeric columns.
    pub const fn right() -> Self {
        Self::centered_vertically(HorizontalAlignment::Right)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HorizontalAlignment {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VerticalAlignment {
    Top,
    #[default]
    Center,
    Bottom,
}

/// An RGBA color, the usual payload of foreground/background rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::from_rgb(0, 0, 0);
    pub const WHITE: Color = Color::from_rgb(255, 255, 255);
    pub const RED: Color = Color::from_rgb(255, 0, 0);
    pub const GRAY: Color = Color::from_rgb(128, 128, 128);

    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Creates a color with an alpha channel.
    pub const fn from_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

macro_rules! copy_accessors {
    ($($name:ident: $variant:ident => $ty:ty),* $(,)?) => {
        $(
            pub fn $name(&self) -> Option<$ty> {
                match *self {
                    ItemData::$variant(value) => Some(value),
                    _ => None,
                }
            }
        )*
    };
}

macro_rules! item_data_from {
    ($($ty:ty => |$v:ident| $body:expr),* $(,)?) => {
        $(
            impl From<$ty> for ItemData {
                fn from($v: $ty) -> Self {
                    $body
                }
            }
        )*
    };
}

/// Type-erased container for cell data.
///
/// `ItemData` is what a model answers for a `(index, role)` query and what
/// an edit carries back. [`ItemData::None`] is the defined empty value for
/// absent fields, unsupported roles and invalid coordinates.
///
/// # Example
///
/// ```
/// use tabula::model::ItemData;
///
/// let data = ItemData::from("Hello");
/// assert_eq!(data.as_string(), Some("Hello"));
/// assert_eq!(data.to_string(), "Hello");
///
/// let data = ItemData::new(42u32);
/// assert_eq!(data.downcast::<u32>(), Some(&42));
/// ```
#[derive(Clone, Default)]
pub enum ItemData {
    /// No data.
    #[default]
    None,
    /// String data.
    String(String),
    /// Integer data.
    Int(i64),
    /// Floating point data.
    Float(f64),
    /// Boolean data.
    Bool(bool),
    /// Color data.
    Color(Color),
    /// Text alignment data.
    TextAlignment(TextAlignment),
    /// Size data (width, height).
    Size(f32, f32),
    /// A stored row reference (the row's identity).
    Row(RowRef),
    /// Custom data (type-erased, shared).
    Custom(Arc<dyn Any + Send + Sync>),
}

impl ItemData {
    /// Wraps an arbitrary value as `Custom`.
    pub fn new<T: Any + Send + Sync + 'static>(value: T) -> Self {
        ItemData::Custom(Arc::new(value))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ItemData::None)
    }

    pub fn is_some(&self) -> bool {
        !self.is_none()
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            ItemData::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            ItemData::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of the value; integers widen.
    pub fn as_float(&self) -> Option<f64> {
        match *self {
            ItemData::Float(n) => Some(n),
            ItemData::Int(n) => Some(n as f64),
            _ => None,
        }
    }

    copy_accessors! {
        as_int: Int => i64,
        as_bool: Bool => bool,
        as_color: Color => Color,
        as_text_alignment: TextAlignment => TextAlignment,
    }

    pub fn as_size(&self) -> Option<(f32, f32)> {
        match *self {
            ItemData::Size(w, h) => Some((w, h)),
            _ => None,
        }
    }

    pub fn as_row(&self) -> Option<&RowRef> {
        match self {
            ItemData::Row(row) => Some(row),
            _ => None,
        }
    }

    /// Takes the row reference out of `RowIdentity` answers.
    pub fn into_row(self) -> Option<RowRef> {
        match self {
            ItemData::Row(row) => Some(row),
            _ => None,
        }
    }

    /// Attempts to downcast custom data to the specified type.
    pub fn downcast<T: Any>(&self) -> Option<&T> {
        match self {
            ItemData::Custom(data) => data.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl PartialEq for ItemData {
    /// Values compare by value; rows and custom data compare by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ItemData::None, ItemData::None) => true,
            (ItemData::String(a), ItemData::String(b)) => a == b,
            (ItemData::Int(a), ItemData::Int(b)) => a == b,
            (ItemData::Float(a), ItemData::Float(b)) => a == b,
            (ItemData::Bool(a), ItemData::Bool(b)) => a == b,
            (ItemData::Color(a), ItemData::Color(b)) => a == b,
            (ItemData::TextAlignment(a), ItemData::TextAlignment(b)) => a == b,
            (ItemData::Size(aw, ah), ItemData::Size(bw, bh)) => aw == bw && ah == bh,
            (ItemData::Row(a), ItemData::Row(b)) => a.same_row(b),
            (ItemData::Custom(a), ItemData::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for ItemData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemData::None => f.write_str("None"),
            ItemData::String(s) => f.debug_tuple("String").field(s).finish(),
            ItemData::Int(n) => f.debug_tuple("Int").field(n).finish(),
            ItemData::Float(n) => f.debug_tuple("Float").field(n).finish(),
            ItemData::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            ItemData::Color(c) => f.debug_tuple("Color").field(c).finish(),
            ItemData::TextAlignment(a) => f.debug_tuple("TextAlignment").field(a).finish(),
            ItemData::Size(w, h) => f.debug_tuple("Size").field(w).field(h).finish(),
            ItemData::Row(row) => row.fmt(f),
            ItemData::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// The formatted value of a cell, used for display and for detecting no-op
/// edits.
impl fmt::Display for ItemData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemData::None | ItemData::Custom(_) => Ok(()),
            ItemData::String(s) => f.write_str(s),
            ItemData::Int(n) => write!(f, "{n}"),
            ItemData::Float(n) => write!(f, "{n}"),
            ItemData::Bool(b) => write!(f, "{b}"),
            ItemData::Color(c) => write!(f, "{c}"),
            ItemData::TextAlignment(a) => write!(f, "{:?}/{:?}", a.horizontal, a.vertical),
            ItemData::Size(w, h) => write!(f, "{w}x{h}"),
            ItemData::Row(row) => write!(f, "{}", *row.read()),
        }
    }
}

item_data_from! {
    String => |s| ItemData::String(s),
    &str => |s| ItemData::String(s.to_owned()),
    &String => |s| ItemData::String(s.clone()),
    i64 => |n| ItemData::Int(n),
    i32 => |n| ItemData::Int(n.into()),
    u32 => |n| ItemData::Int(n.into()),
    usize => |n| ItemData::Int(n as i64),
    f64 => |n| ItemData::Float(n),
    f32 => |n| ItemData::Float(n.into()),
    bool => |b| ItemData::Bool(b),
    Color => |c| ItemData::Color(c),
    TextAlignment => |a| ItemData::TextAlignment(a),
    RowRef => |row| ItemData::Row(row),
}

impl<T: Into<ItemData>> From<Option<T>> for ItemData {
    fn from(value: Option<T>) -> Self {
        value.map_or(ItemData::None, Into::into)
    }
}
