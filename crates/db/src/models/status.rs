//! Status helper enums mapping to SMALLSERIAL/SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order
//! (1-based) in the corresponding `*_statuses` database table. The
//! core crate's `lifecycle` module duplicates these ids on purpose --
//! core has zero internal deps.

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Slideshow lifecycle status. Transitions are owned exclusively
    /// by the render queue/executor once a render is admitted; `Draft`
    /// is the only state the editor writes to.
    SlideshowStatus {
        Draft = 1,
        Queued = 2,
        Rendering = 3,
        Completed = 4,
    }
}

impl SlideshowStatus {
    /// Parse a database status id.
    pub fn from_id(id: StatusId) -> Option<Self> {
        match id {
            1 => Some(Self::Draft),
            2 => Some(Self::Queued),
            3 => Some(Self::Rendering),
            4 => Some(Self::Completed),
            _ => None,
        }
    }

    /// Lowercase wire name, matching the seed data.
    pub fn name(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Queued => "queued",
            Self::Rendering => "rendering",
            Self::Completed => "completed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_match_seed_order() {
        assert_eq!(SlideshowStatus::Draft.id(), 1);
        assert_eq!(SlideshowStatus::Queued.id(), 2);
        assert_eq!(SlideshowStatus::Rendering.id(), 3);
        assert_eq!(SlideshowStatus::Completed.id(), 4);
    }

    #[test]
    fn ids_round_trip() {
        for status in [
            SlideshowStatus::Draft,
            SlideshowStatus::Queued,
            SlideshowStatus::Rendering,
            SlideshowStatus::Completed,
        ] {
            assert_eq!(SlideshowStatus::from_id(status.id()), Some(status));
        }
        assert_eq!(SlideshowStatus::from_id(9), None);
    }

    #[test]
    fn ids_agree_with_core_lifecycle() {
        use slidereel_core::lifecycle;
        assert_eq!(SlideshowStatus::Draft.id(), lifecycle::STATUS_DRAFT);
        assert_eq!(SlideshowStatus::Queued.id(), lifecycle::STATUS_QUEUED);
        assert_eq!(SlideshowStatus::Rendering.id(), lifecycle::STATUS_RENDERING);
        assert_eq!(SlideshowStatus::Completed.id(), lifecycle::STATUS_COMPLETED);
    }
}
