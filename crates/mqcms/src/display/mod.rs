//! Display layout: which section shows which media, and for how long.
//!
//! Both documents live in the documents store, apart from the media objects
//! they describe.

mod assignments;
mod document;
mod settings;

pub use assignments::{Assignment, SectionAssignments};
pub use settings::{DisplaySettings, SettingsError};

/// Layout sections a display renders media into.
pub const SECTIONS: &[&str] = &[
    "header_video",
    "carousel_top_left",
    "carousel_top_right",
    "carousel_bottom_left",
    "carousel_bottom_right",
    "footer_content",
];

pub fn is_section(name: &str) -> bool {
    SECTIONS.contains(&name)
}
