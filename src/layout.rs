//! Presence-dependent vertical layout of the text block.
//!
//! The layout is a pure function of which fields are present ([`FieldSet`]);
//! it knows nothing about fonts or pixels. The name is always the first
//! line, at relative offset 0. Job title and department follow with fixed
//! gaps, then the contact block (phone, email, website) at a fixed line
//! height. Gaps widen when optional lines above them are missing so the
//! block never looks cramped, and the whole block is centered vertically on
//! [`CONTENT_CENTER_Y`].
//!
//! ```text
//!            ┌ block top ─────────────── padding 28
//!   offset 0 │ Name
//!         37 │ Job title
//!         67 │ Department
//!         95 │ ┃ Phone
//!        116 │ ┃ Email
//!        137 │ ┃ Website
//!            └ block bottom ──────────── padding 5
//! ```

use crate::request::SignatureRequest;

/// Gap from the name to the job title.
pub const NAME_TO_JOB_TITLE: f32 = 37.0;
/// Gap from the job title to the department.
pub const JOB_TITLE_TO_DEPARTMENT: f32 = 30.0;
/// Gap from the department to the first contact line.
pub const DEPARTMENT_TO_CONTACTS: f32 = 28.0;
/// Extra gap when one optional upper line is missing.
pub const WIDEN_ONE_ABSENT: f32 = 5.0;
/// Extra gap when both optional upper lines are missing.
pub const WIDEN_TWO_ABSENT: f32 = 15.0;
pub const CONTACT_LINE_HEIGHT: f32 = 21.0;
pub const BLOCK_PADDING_TOP: f32 = 28.0;
pub const BLOCK_PADDING_BOTTOM: f32 = 5.0;
/// Vertical center the text block is balanced on (the photo's center).
pub const CONTENT_CENTER_Y: f32 = 185.0;
pub const DIVIDER_INSET_TOP: f32 = 14.0;
/// Top inset when the contact block has a single line.
pub const DIVIDER_INSET_TOP_SINGLE: f32 = 10.0;
pub const DIVIDER_INSET_BOTTOM: f32 = 4.0;

// ============================================================================
// Fields
// ============================================================================

/// A text line of the signature, in drawing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    JobTitle,
    Department,
    Phone,
    Email,
    Website,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Name,
        Field::JobTitle,
        Field::Department,
        Field::Phone,
        Field::Email,
        Field::Website,
    ];

    /// Optional lines between the name and the contact block.
    pub const UPPER: [Field; 2] = [Field::JobTitle, Field::Department];

    pub const CONTACT: [Field; 3] = [Field::Phone, Field::Email, Field::Website];

    fn bit(self) -> u8 {
        1 << self as u8
    }

    pub fn is_contact(self) -> bool {
        Self::CONTACT.contains(&self)
    }

    /// The request text for this line, `None` when absent.
    pub fn text(self, request: &SignatureRequest) -> Option<&str> {
        match self {
            Field::Name => Some(request.name.as_str()),
            Field::JobTitle => request.job_title(),
            Field::Department => request.department(),
            Field::Phone => request.phone(),
            Field::Email => request.email(),
            Field::Website => request.website(),
        }
    }
}

/// Bitset of present fields. The name is always present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldSet(u8);

impl Default for FieldSet {
    fn default() -> Self {
        Self::NAME_ONLY
    }
}

impl FieldSet {
    pub const NAME_ONLY: FieldSet = FieldSet(1 << Field::Name as u8);

    pub fn from_request(request: &SignatureRequest) -> Self {
        Field::ALL
            .into_iter()
            .filter(|field| field.text(request).is_some())
            .fold(Self::NAME_ONLY, Self::with)
    }

    pub fn with(self, field: Field) -> Self {
        Self(self.0 | field.bit())
    }

    pub fn contains(self, field: Field) -> bool {
        self.0 & field.bit() != 0
    }

    /// Present contact fields in fixed order.
    pub fn contacts(self) -> impl Iterator<Item = Field> {
        Field::CONTACT.into_iter().filter(move |f| self.contains(*f))
    }

    fn absent_upper(self) -> usize {
        Field::UPPER.iter().filter(|f| !self.contains(**f)).count()
    }
}

impl FromIterator<Field> for FieldSet {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NAME_ONLY, Self::with)
    }
}

// ============================================================================
// Layout
// ============================================================================

/// A line positioned by the layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedLine {
    pub field: Field,
    /// Baseline relative to the name's baseline.
    pub offset: f32,
    /// Absolute baseline on the canvas, in logical pixels.
    pub y: f32,
}

/// Vertical rule beside the contact block, in absolute logical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Divider {
    pub top: f32,
    pub bottom: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    /// Present lines in drawing order.
    pub lines: Vec<PlacedLine>,
    /// Relative baseline of the last present upper line (0 when only the
    /// name is present).
    pub upper_cursor: f32,
    /// Height of the block including padding.
    pub total_block_height: f32,
    /// Absolute baseline of the name.
    pub origin_y: f32,
    pub divider: Option<Divider>,
}

impl Layout {
    pub fn line(&self, field: Field) -> Option<&PlacedLine> {
        self.lines.iter().find(|line| line.field == field)
    }

    pub fn contact_lines(&self) -> impl Iterator<Item = &PlacedLine> {
        self.lines.iter().filter(|line| line.field.is_contact())
    }

    /// `(field, relative offset)` pairs in drawing order.
    pub fn baseline_offsets(&self) -> Vec<(Field, f32)> {
        self.lines.iter().map(|l| (l.field, l.offset)).collect()
    }

    pub fn block_top(&self) -> f32 {
        self.origin_y - BLOCK_PADDING_TOP
    }

    pub fn block_bottom(&self) -> f32 {
        self.block_top() + self.total_block_height
    }
}

fn widening(absent: usize) -> f32 {
    match absent {
        0 => 0.0,
        1 => WIDEN_ONE_ABSENT,
        _ => WIDEN_TWO_ABSENT,
    }
}

/// Computes baselines for every present line.
pub fn compute_layout(fields: FieldSet) -> Layout {
    let mut offsets = vec![(Field::Name, 0.0f32)];

    // Upper block: each present line advances by its own gap, widened by the
    // number of optional lines skipped since the last present one.
    let mut cursor = 0.0f32;
    let mut skipped = 0;
    let upper_gaps = [
        (Field::JobTitle, NAME_TO_JOB_TITLE),
        (Field::Department, JOB_TITLE_TO_DEPARTMENT),
    ];
    for (field, gap) in upper_gaps {
        if fields.contains(field) {
            cursor += gap + widening(skipped);
            offsets.push((field, cursor));
            skipped = 0;
        } else {
            skipped += 1;
        }
    }

    // Contact block: the gap grows with every missing upper line.
    let contact_start = cursor + DEPARTMENT_TO_CONTACTS + widening(fields.absent_upper());
    let contacts: Vec<Field> = fields.contacts().collect();
    for (i, field) in contacts.iter().enumerate() {
        offsets.push((*field, contact_start + i as f32 * CONTACT_LINE_HEIGHT));
    }

    let span = offsets.last().map_or(0.0, |(_, offset)| *offset);
    let total_block_height = span + BLOCK_PADDING_TOP + BLOCK_PADDING_BOTTOM;
    let origin_y = CONTENT_CENTER_Y - total_block_height / 2.0 + BLOCK_PADDING_TOP;

    let lines: Vec<PlacedLine> = offsets
        .into_iter()
        .map(|(field, offset)| PlacedLine {
            field,
            offset,
            y: origin_y + offset,
        })
        .collect();

    let divider = divider_for(&lines, contacts.len());

    Layout {
        lines,
        upper_cursor: cursor,
        total_block_height,
        origin_y,
        divider,
    }
}

fn divider_for(lines: &[PlacedLine], contact_count: usize) -> Option<Divider> {
    let mut contacts = lines.iter().filter(|l| l.field.is_contact());
    let first = contacts.next()?;
    let last = contacts.last().unwrap_or(first);
    let inset_top = if contact_count == 1 {
        DIVIDER_INSET_TOP_SINGLE
    } else {
        DIVIDER_INSET_TOP
    };
    Some(Divider {
        top: first.y - inset_top,
        bottom: last.y + DIVIDER_INSET_BOTTOM,
    })
}

// ============================================================================
// Tests
// ============================================================================
