//! Region and group classification codes.
//!
//! A region names the lexical kind of a span; the group coarsens regions
//! into the three classes the analyses care about (comment, string,
//! outside). The pair packs into a 16-bit code — low byte region, high
//! byte group — which is what file rows and rule tables store.

/// Lexical region kind.
///
/// A region is *multiline* iff its numeric code is at or above
/// [`Region::BlockComment`]; note that strings rank above block comments,
/// so entering a string does not terminate the current code line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Region {
    None = 0,
    LineComment = 1,
    BlockComment = 2,
    Str = 3,
    RawString = 4,
    Number = 5,
    Identifier = 6,
    Operator = 7,
    Whitespace = 8,
    End = 9,
    ScriptCode = 10,
    Text = 11,
    Heading = 12,
    Table = 13,
    Summary = 14,
    Configuration = 15,
}

/// Coarse classification of a region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RegionGroup {
    None = 0,
    Comment = 1,
    String = 2,
    Outside = 3,
}

impl Region {
    /// `true` when the region may span line boundaries.
    #[inline]
    pub fn is_multiline(self) -> bool {
        self as u8 >= Region::BlockComment as u8
    }

    /// Group the region belongs to.
    pub fn group(self) -> RegionGroup {
        match self {
            Region::LineComment | Region::BlockComment => RegionGroup::Comment,
            Region::Str | Region::RawString => RegionGroup::String,
            Region::None => RegionGroup::None,
            _ => RegionGroup::Outside,
        }
    }

    /// Pack region and group into the 16-bit wire code.
    pub fn code(self) -> RegionCode {
        RegionCode::new(self, self.group())
    }

    /// Display name used by reports and trace output.
    pub fn name(self) -> &'static str {
        match self {
            Region::None => "none",
            Region::LineComment => "line-comment",
            Region::BlockComment => "block-comment",
            Region::Str => "string",
            Region::RawString => "raw-string",
            Region::Number => "number",
            Region::Identifier => "identifier",
            Region::Operator => "operator",
            Region::Whitespace => "whitespace",
            Region::End => "end",
            Region::ScriptCode => "script-code",
            Region::Text => "text",
            Region::Heading => "heading",
            Region::Table => "table",
            Region::Summary => "summary",
            Region::Configuration => "configuration",
        }
    }
}

/// Packed `(region, group)` pair: low byte region, high byte group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RegionCode(u16);

impl RegionCode {
    pub fn new(region: Region, group: RegionGroup) -> Self {
        Self(u16::from(region as u8) | (u16::from(group as u8) << 8))
    }

    /// Raw 16-bit value.
    #[inline]
    pub fn raw(self) -> u16 {
        self.0
    }

    /// Low byte: the region number.
    #[inline]
    pub fn region_number(self) -> u8 {
        #[allow(clippy::cast_possible_truncation, reason = "masked to the low byte")]
        {
            (self.0 & 0x00FF) as u8
        }
    }

    /// High byte: the group number.
    #[inline]
    pub fn group_number(self) -> u8 {
        (self.0 >> 8) as u8
    }
}
