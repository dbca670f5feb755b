//! Enumerated wire values for the fan's product-state fields
//!
//! Every field the fan reports or accepts is a short token on the wire. Each
//! enum here maps the known tokens to domain values and keeps anything else in
//! an `Other` variant, so a firmware update that adds a token does not make
//! whole status messages undecodable.

/// Defines a wire-token enum with an `Other` fallback variant
///
/// Generates the enum plus `from_wire`, `as_wire` and `Display`.
///
/// # Example
/// ```rust,ignore
/// wire_enum! {
///     /// Night mode
///     NightMode {
///         On => "ON",
///         Off => "OFF",
///     }
/// }
/// ```
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident => $token:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                $variant,
            )+
            /// Token this library does not know, kept verbatim
            Other(String),
        }

        impl $name {
            /// Map a wire token to a value, preserving unknown tokens
            pub fn from_wire(token: &str) -> Self {
                match token {
                    $($token => Self::$variant,)+
                    other => Self::Other(other.to_string()),
                }
            }

            /// The token sent on the wire for this value
            pub fn as_wire(&self) -> &str {
                match self {
                    $(Self::$variant => $token,)+
                    Self::Other(token) => token.as_str(),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_wire())
            }
        }
    };
}

wire_enum! {
    /// Requested fan operating mode (`fmod`)
    FanMode {
        /// Manual speed
        Fan => "FAN",
        /// Speed driven by the air-quality sensor
        Auto => "AUTO",
        Off => "OFF",
    }
}

wire_enum! {
    /// Whether the motor is actually spinning (`fnst`)
    FanState {
        Running => "FAN",
        Idle => "OFF",
    }
}

wire_enum! {
    /// Requested fan speed (`fnsp`)
    FanSpeed {
        Speed1 => "0001",
        Speed2 => "0002",
        Speed3 => "0003",
        Speed4 => "0004",
        Speed5 => "0005",
        Speed6 => "0006",
        Speed7 => "0007",
        Speed8 => "0008",
        Speed9 => "0009",
        Speed10 => "0010",
        Auto => "AUTO",
    }
}

impl FanSpeed {
    /// Fixed speed for a level between 1 and 10
    pub fn level(level: u8) -> Option<Self> {
        let speed = match level {
            1 => Self::Speed1,
            2 => Self::Speed2,
            3 => Self::Speed3,
            4 => Self::Speed4,
            5 => Self::Speed5,
            6 => Self::Speed6,
            7 => Self::Speed7,
            8 => Self::Speed8,
            9 => Self::Speed9,
            10 => Self::Speed10,
            _ => return None,
        };
        Some(speed)
    }

    /// Numeric level, `None` for auto or unknown tokens
    pub fn as_level(&self) -> Option<u8> {
        match self {
            Self::Auto | Self::Other(_) => None,
            fixed => fixed.as_wire().parse().ok(),
        }
    }
}

wire_enum! {
    /// Oscillation (`oson`)
    Oscillation {
        On => "ON",
        Off => "OFF",
    }
}

wire_enum! {
    /// Night mode (`nmod`)
    NightMode {
        On => "ON",
        Off => "OFF",
    }
}

wire_enum! {
    /// Air-quality target tier (`qtar`)
    QualityTarget {
        Normal => "0004",
        High => "0003",
        Better => "0001",
    }
}

wire_enum! {
    /// Keep sensors monitoring while the fan is off (`rhtm`)
    StandbyMonitoring {
        On => "ON",
        Off => "OFF",
    }
}

wire_enum! {
    /// Filter-life reset request (`rstf`)
    ResetFilter {
        Reset => "RSTF",
        Keep => "STET",
    }
}
