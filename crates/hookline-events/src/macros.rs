/// Declare an event enum whose variants each carry a constant type tag.
///
/// Generates the enum itself (attributes pass through, so derive what the
/// payload fields support), an [`EventKind`](crate::EventKind) impl, `as_str`,
/// a `TAGS` table in declaration order, `is_known_tag`, and `Display`.
///
/// Variants are either unit variants or carry named fields:
///
/// ```
/// use hookline_events::{define_trigger_events, EventKind};
///
/// define_trigger_events! {
///     /// Lifecycle points of a session.
///     #[derive(Clone, Debug, PartialEq)]
///     pub enum SessionEvent {
///         /// A session began.
///         Started => "session.start",
///         /// A tool is about to run.
///         ToolUse {
///             /// Tool name.
///             tool: String,
///         } => "tool.use",
///     }
/// }
///
/// let event = SessionEvent::ToolUse { tool: "bash".into() };
/// assert_eq!(event.event_type(), "tool.use");
/// assert_eq!(SessionEvent::TAGS, &["session.start", "tool.use"]);
/// ```
#[macro_export]
macro_rules! define_trigger_events {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident $({ $($(#[$fmeta:meta])* $field:ident : $fty:ty),* $(,)? })? => $wire:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $(
                $(#[$vmeta])*
                $variant $({ $($(#[$fmeta])* $field : $fty),* })?,
            )*
        }

        impl $name {
            /// Every tag of this enum, in declaration order.
            pub const TAGS: &'static [&'static str] = &[$($wire),*];

            /// The constant tag of this variant.
            #[must_use]
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant { .. } => $wire,)*
                }
            }

            /// Whether `tag` belongs to one of this enum's variants.
            #[must_use]
            pub fn is_known_tag(tag: &str) -> bool {
                Self::TAGS.contains(&tag)
            }
        }

        impl $crate::EventKind for $name {
            fn event_type(&self) -> &str {
                self.as_str()
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}
