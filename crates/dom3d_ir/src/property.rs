//! Element kinds, mutable properties and typed mutations
//!
//! Every mutation crossing the channel names a property as a string and
//! carries an untyped [`Value`]. Both realms narrow that pair into a
//! [`Mutation`] through the same static allow-list table, so a request the
//! kernel accepts locally is judged by identical rules on the graft.

use crate::error::MutationError;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The concrete variants of a 3D DOM element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementKind {
    Model,
    Material,
    PbrMetallicRoughness,
    TextureInfo,
    Texture,
    Sampler,
    Image,
}

impl ElementKind {
    /// Properties a facade of this kind may mutate
    pub fn allowed_properties(self) -> &'static [Property] {
        match self {
            Self::Material => MATERIAL_PROPERTIES,
            Self::PbrMetallicRoughness => PBR_PROPERTIES,
            Self::Sampler => SAMPLER_PROPERTIES,
            Self::Model | Self::TextureInfo | Self::Texture | Self::Image => &[],
        }
    }

    /// Whether `property` is in this kind's allow-list
    pub fn accepts(self, property: Property) -> bool {
        self.allowed_properties().contains(&property)
    }

    /// Name used in log messages
    pub fn name(self) -> &'static str {
        match self {
            Self::Model => "Model",
            Self::Material => "Material",
            Self::PbrMetallicRoughness => "PBRMetallicRoughness",
            Self::TextureInfo => "TextureInfo",
            Self::Texture => "Texture",
            Self::Sampler => "Sampler",
            Self::Image => "Image",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A mutable property, named as in the document format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Property {
    BaseColorFactor,
    MetallicFactor,
    RoughnessFactor,
    EmissiveFactor,
    AlphaMode,
    AlphaCutoff,
    DoubleSided,
    MinFilter,
    MagFilter,
    WrapS,
    WrapT,
}

// Material accepts the PBR factors too and routes them to its owned PBR record.
const MATERIAL_PROPERTIES: &[Property] = &[
    Property::BaseColorFactor,
    Property::MetallicFactor,
    Property::RoughnessFactor,
    Property::EmissiveFactor,
    Property::AlphaMode,
    Property::AlphaCutoff,
    Property::DoubleSided,
];

const PBR_PROPERTIES: &[Property] = &[
    Property::BaseColorFactor,
    Property::MetallicFactor,
    Property::RoughnessFactor,
];

const SAMPLER_PROPERTIES: &[Property] = &[
    Property::MinFilter,
    Property::MagFilter,
    Property::WrapS,
    Property::WrapT,
];

impl Property {
    /// Every property, in declaration order
    pub const ALL: [Property; 11] = [
        Property::BaseColorFactor,
        Property::MetallicFactor,
        Property::RoughnessFactor,
        Property::EmissiveFactor,
        Property::AlphaMode,
        Property::AlphaCutoff,
        Property::DoubleSided,
        Property::MinFilter,
        Property::MagFilter,
        Property::WrapS,
        Property::WrapT,
    ];

    /// Wire name of the property
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BaseColorFactor => "baseColorFactor",
            Self::MetallicFactor => "metallicFactor",
            Self::RoughnessFactor => "roughnessFactor",
            Self::EmissiveFactor => "emissiveFactor",
            Self::AlphaMode => "alphaMode",
            Self::AlphaCutoff => "alphaCutoff",
            Self::DoubleSided => "doubleSided",
            Self::MinFilter => "minFilter",
            Self::MagFilter => "magFilter",
            Self::WrapS => "wrapS",
            Self::WrapT => "wrapT",
        }
    }

    /// Look a property up by wire name
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == name)
    }

    /// Whether this property lives on PBRMetallicRoughness
    pub fn is_pbr(self) -> bool {
        PBR_PROPERTIES.contains(&self)
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Material alpha mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlphaMode {
    Opaque,
    Mask,
    Blend,
}

impl AlphaMode {
    /// Wire name of the mode
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Opaque => "OPAQUE",
            Self::Mask => "MASK",
            Self::Blend => "BLEND",
        }
    }

    /// Parse a wire name
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "OPAQUE" => Some(Self::Opaque),
            "MASK" => Some(Self::Mask),
            "BLEND" => Some(Self::Blend),
            _ => None,
        }
    }
}

macro_rules! gl_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $code:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "u32", into = "u32")]
        pub enum $name {
            $($variant = $code),+
        }

        impl $name {
            /// GL enum value as stored in the document
            pub fn code(self) -> u32 {
                self as u32
            }
        }

        impl TryFrom<u32> for $name {
            type Error = String;

            fn try_from(code: u32) -> Result<Self, Self::Error> {
                match code {
                    $($code => Ok(Self::$variant),)+
                    other => Err(format!("invalid {} code {}", stringify!($name), other)),
                }
            }
        }

        impl From<$name> for u32 {
            fn from(value: $name) -> u32 {
                value.code()
            }
        }
    };
}

gl_enum! {
    /// Sampler magnification filter
    MagFilter {
        Nearest = 9728,
        Linear = 9729,
    }
}

gl_enum! {
    /// Sampler minification filter
    MinFilter {
        Nearest = 9728,
        Linear = 9729,
        NearestMipmapNearest = 9984,
        LinearMipmapNearest = 9985,
        NearestMipmapLinear = 9986,
        LinearMipmapLinear = 9987,
    }
}

gl_enum! {
    /// Sampler wrapping mode
    WrapMode {
        ClampToEdge = 33071,
        MirroredRepeat = 33648,
        Repeat = 10497,
    }
}

/// A validated, strongly typed mutation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mutation {
    BaseColorFactor([f32; 4]),
    MetallicFactor(f32),
    RoughnessFactor(f32),
    EmissiveFactor([f32; 3]),
    AlphaMode(AlphaMode),
    AlphaCutoff(f32),
    DoubleSided(bool),
    MinFilter(MinFilter),
    MagFilter(MagFilter),
    WrapS(WrapMode),
    WrapT(WrapMode),
}

impl Mutation {
    /// Narrow a wire `(property, value)` pair for an element of `kind`
    ///
    /// Fails with [`MutationError::UnsupportedMutation`] when the property is
    /// unknown, not in the kind's allow-list, or the value has the wrong shape.
    pub fn parse(kind: ElementKind, property: &str, value: &Value) -> Result<Self, MutationError> {
        let property = Property::parse(property).ok_or(MutationError::UnsupportedMutation)?;
        if !kind.accepts(property) {
            return Err(MutationError::UnsupportedMutation);
        }
        Self::from_value(property, value).ok_or(MutationError::UnsupportedMutation)
    }

    /// Decode a value for `property`, checking its shape and range
    pub fn from_value(property: Property, value: &Value) -> Option<Self> {
        let mutation = match property {
            Property::BaseColorFactor => {
                let c = value.as_vec4()?;
                Self::BaseColorFactor([unit(c[0])?, unit(c[1])?, unit(c[2])?, unit(c[3])?])
            }
            Property::MetallicFactor => Self::MetallicFactor(unit(value.as_float()?)?),
            Property::RoughnessFactor => Self::RoughnessFactor(unit(value.as_float()?)?),
            Property::EmissiveFactor => {
                let c = value.as_vec3()?;
                Self::EmissiveFactor([unit(c[0])?, unit(c[1])?, unit(c[2])?])
            }
            Property::AlphaMode => Self::AlphaMode(AlphaMode::parse(value.as_str()?)?),
            Property::AlphaCutoff => {
                let cutoff = value.as_float()?;
                if !cutoff.is_finite() || cutoff < 0.0 {
                    return None;
                }
                Self::AlphaCutoff(cutoff as f32)
            }
            Property::DoubleSided => Self::DoubleSided(value.as_bool()?),
            Property::MinFilter => Self::MinFilter(MinFilter::try_from(gl_code(value)?).ok()?),
            Property::MagFilter => Self::MagFilter(MagFilter::try_from(gl_code(value)?).ok()?),
            Property::WrapS => Self::WrapS(WrapMode::try_from(gl_code(value)?).ok()?),
            Property::WrapT => Self::WrapT(WrapMode::try_from(gl_code(value)?).ok()?),
        };
        Some(mutation)
    }

    /// The property this mutation writes
    pub fn property(&self) -> Property {
        match self {
            Self::BaseColorFactor(_) => Property::BaseColorFactor,
            Self::MetallicFactor(_) => Property::MetallicFactor,
            Self::RoughnessFactor(_) => Property::RoughnessFactor,
            Self::EmissiveFactor(_) => Property::EmissiveFactor,
            Self::AlphaMode(_) => Property::AlphaMode,
            Self::AlphaCutoff(_) => Property::AlphaCutoff,
            Self::DoubleSided(_) => Property::DoubleSided,
            Self::MinFilter(_) => Property::MinFilter,
            Self::MagFilter(_) => Property::MagFilter,
            Self::WrapS(_) => Property::WrapS,
            Self::WrapT(_) => Property::WrapT,
        }
    }

    /// Wire representation of the mutated value
    pub fn to_value(&self) -> Value {
        match *self {
            Self::BaseColorFactor(c) => c.into(),
            Self::MetallicFactor(f) | Self::RoughnessFactor(f) | Self::AlphaCutoff(f) => f.into(),
            Self::EmissiveFactor(c) => c.into(),
            Self::AlphaMode(mode) => mode.as_str().into(),
            Self::DoubleSided(b) => b.into(),
            Self::MinFilter(filter) => filter.code().into(),
            Self::MagFilter(filter) => filter.code().into(),
            Self::WrapS(wrap) | Self::WrapT(wrap) => wrap.code().into(),
        }
    }
}

fn unit(x: f64) -> Option<f32> {
    (x.is_finite() && (0.0..=1.0).contains(&x)).then_some(x as f32)
}

fn gl_code(value: &Value) -> Option<u32> {
    value.as_int().and_then(|code| u32::try_from(code).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_lists() {
        assert!(ElementKind::PbrMetallicRoughness.accepts(Property::MetallicFactor));
        assert!(!ElementKind::PbrMetallicRoughness.accepts(Property::WrapS));
        assert!(ElementKind::Sampler.accepts(Property::WrapT));
        assert!(ElementKind::Material.accepts(Property::MetallicFactor));
        assert!(ElementKind::Image.allowed_properties().is_empty());
    }

    #[test]
    fn test_property_names_round_trip() {
        for property in Property::ALL {
            assert_eq!(Property::parse(property.as_str()), Some(property));
            let json = serde_json::to_string(&property).unwrap();
            assert_eq!(json, format!("\"{}\"", property.as_str()));
        }
        assert_eq!(Property::parse("nonExistentProp"), None);
    }

    #[test]
    fn test_parse_rejects_unknown_and_disallowed() {
        let kind = ElementKind::PbrMetallicRoughness;
        assert_eq!(
            Mutation::parse(kind, "nonExistentProp", &Value::from(1)),
            Err(MutationError::UnsupportedMutation)
        );
        assert_eq!(
            Mutation::parse(kind, "wrapS", &Value::from(10497)),
            Err(MutationError::UnsupportedMutation)
        );
        assert_eq!(
            Mutation::parse(kind, "metallicFactor", &Value::from(0.5)),
            Ok(Mutation::MetallicFactor(0.5))
        );
    }

    #[test]
    fn test_parse_checks_value_shape() {
        let kind = ElementKind::Material;
        assert!(Mutation::parse(kind, "metallicFactor", &Value::from(1.5)).is_err());
        assert!(Mutation::parse(kind, "metallicFactor", &Value::from("0.5")).is_err());
        assert!(Mutation::parse(kind, "baseColorFactor", &Value::from([1.0f32, 0.0, 0.0])).is_err());
        assert!(Mutation::parse(kind, "alphaMode", &Value::from("CUTOUT")).is_err());
        assert!(Mutation::parse(kind, "alphaCutoff", &Value::from(-0.1)).is_err());
        assert_eq!(
            Mutation::parse(kind, "alphaMode", &Value::from("MASK")),
            Ok(Mutation::AlphaMode(AlphaMode::Mask))
        );
        assert_eq!(
            Mutation::parse(kind, "baseColorFactor", &Value::from([1.0f32, 0.5, 0.0, 1.0])),
            Ok(Mutation::BaseColorFactor([1.0, 0.5, 0.0, 1.0]))
        );
    }

    #[test]
    fn test_sampler_codes() {
        let kind = ElementKind::Sampler;
        assert_eq!(
            Mutation::parse(kind, "magFilter", &Value::from(9728)),
            Ok(Mutation::MagFilter(MagFilter::Nearest))
        );
        assert!(Mutation::parse(kind, "magFilter", &Value::from(9987)).is_err());
        assert_eq!(
            Mutation::parse(kind, "minFilter", &Value::from(9987)),
            Ok(Mutation::MinFilter(MinFilter::LinearMipmapLinear))
        );
        assert_eq!(WrapMode::try_from(33648u32), Ok(WrapMode::MirroredRepeat));
        assert_eq!(serde_json::to_string(&WrapMode::Repeat).unwrap(), "10497");
    }

    #[test]
    fn test_value_round_trip_through_mutation() {
        let m = Mutation::EmissiveFactor([0.25, 0.5, 1.0]);
        assert_eq!(Mutation::from_value(m.property(), &m.to_value()), Some(m));
        let m = Mutation::WrapT(WrapMode::ClampToEdge);
        assert_eq!(Mutation::from_value(m.property(), &m.to_value()), Some(m));
    }
}
