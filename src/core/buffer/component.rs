use std::fmt;
use std::str::FromStr;

use super::Err;

/// glTF component types and their wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    Byte = 5120,
    UnsignedByte = 5121,
    Short = 5122,
    UnsignedShort = 5123,
    UnsignedInt = 5125,
    Float = 5126,
}

impl ComponentType {
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Size of one component in bytes.
    pub fn size(self) -> usize {
        match self {
            ComponentType::Byte | ComponentType::UnsignedByte => 1,
            ComponentType::Short | ComponentType::UnsignedShort => 2,
            ComponentType::UnsignedInt | ComponentType::Float => 4,
        }
    }
}

impl TryFrom<u32> for ComponentType {
    type Error = Err;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            5120 => Ok(ComponentType::Byte),
            5121 => Ok(ComponentType::UnsignedByte),
            5122 => Ok(ComponentType::Short),
            5123 => Ok(ComponentType::UnsignedShort),
            5125 => Ok(ComponentType::UnsignedInt),
            5126 => Ok(ComponentType::Float),
            _ => Err(Err::UnsupportedComponentType(code)),
        }
    }
}

/// Shape of one accessor element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
}

impl AccessorType {
    pub fn num_components(self) -> usize {
        match self {
            AccessorType::Scalar => 1,
            AccessorType::Vec2 => 2,
            AccessorType::Vec3 => 3,
            AccessorType::Vec4 => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccessorType::Scalar => "SCALAR",
            AccessorType::Vec2 => "VEC2",
            AccessorType::Vec3 => "VEC3",
            AccessorType::Vec4 => "VEC4",
        }
    }
}

impl fmt::Display for AccessorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessorType {
    type Err = Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCALAR" => Ok(AccessorType::Scalar),
            "VEC2" => Ok(AccessorType::Vec2),
            "VEC3" => Ok(AccessorType::Vec3),
            "VEC4" => Ok(AccessorType::Vec4),
            _ => Err(Err::UnsupportedAccessorType(s.to_owned())),
        }
    }
}

/// A primitive value that can be packed into a glTF buffer.
/// All packing is little-endian.
pub trait Component: Copy + PartialEq + PartialOrd + Default + fmt::Debug {
    const COMPONENT_TYPE: ComponentType;

    fn write_le(self, out: &mut Vec<u8>);

    /// Reads one value from exactly `COMPONENT_TYPE.size()` bytes.
    fn read_le(bytes: &[u8]) -> Self;

    fn to_f64(self) -> f64;

    /// Saturating conversion, used when an accessor stores a different
    /// component type than the one requested.
    fn from_f64(value: f64) -> Self;

    fn to_json(self) -> serde_json::Value;
}

macro_rules! impl_component {
    ($($t:ty => $ct:ident),*) => {
        $(
            impl Component for $t {
                const COMPONENT_TYPE: ComponentType = ComponentType::$ct;

                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                fn read_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$t>()];
                    raw.copy_from_slice(bytes);
                    <$t>::from_le_bytes(raw)
                }

                fn to_f64(self) -> f64 {
                    self as f64
                }

                fn from_f64(value: f64) -> Self {
                    value as $t
                }

                fn to_json(self) -> serde_json::Value {
                    serde_json::Value::from(self)
                }
            }
        )*
    };
}

impl_component! {
    i8 => Byte,
    u8 => UnsignedByte,
    i16 => Short,
    u16 => UnsignedShort,
    u32 => UnsignedInt,
    f32 => Float
}

/// Reads one component stored as `stored` and converts it to `C`.
pub(crate) fn read_component<C: Component>(stored: ComponentType, bytes: &[u8]) -> C {
    if stored == C::COMPONENT_TYPE {
        return C::read_le(bytes);
    }
    let value = match stored {
        ComponentType::Byte => i8::read_le(bytes).to_f64(),
        ComponentType::UnsignedByte => u8::read_le(bytes).to_f64(),
        ComponentType::Short => i16::read_le(bytes).to_f64(),
        ComponentType::UnsignedShort => u16::read_le(bytes).to_f64(),
        ComponentType::UnsignedInt => u32::read_le(bytes).to_f64(),
        ComponentType::Float => f32::read_le(bytes).to_f64(),
    };
    C::from_f64(value)
}

/// One accessor element: a scalar component or a fixed-size vector of them.
/// The element's default value (all components zero) is what sparse
/// accessors leave implicit.
pub trait Element: Copy + PartialEq + fmt::Debug {
    type Component: Component;
    const ACCESSOR_TYPE: AccessorType;

    fn default_value() -> Self;

    fn components(&self) -> &[Self::Component];

    /// Builds an element from exactly `ACCESSOR_TYPE.num_components()` values.
    fn from_components(components: &[Self::Component]) -> Self;

    fn is_default(&self) -> bool {
        *self == Self::default_value()
    }
}

macro_rules! impl_scalar_element {
    ($($t:ty),*) => {
        $(
            impl Element for $t {
                type Component = $t;
                const ACCESSOR_TYPE: AccessorType = AccessorType::Scalar;

                fn default_value() -> Self {
                    <$t>::default()
                }

                fn components(&self) -> &[$t] {
                    std::slice::from_ref(self)
                }

                fn from_components(components: &[$t]) -> Self {
                    components[0]
                }
            }
        )*
    };
}

impl_scalar_element!(i8, u8, i16, u16, u32, f32);

impl<C: Component, const N: usize> Element for [C; N] {
    type Component = C;
    const ACCESSOR_TYPE: AccessorType = match N {
        1 => AccessorType::Scalar,
        2 => AccessorType::Vec2,
        3 => AccessorType::Vec3,
        4 => AccessorType::Vec4,
        _ => panic!("accessor elements have 1 to 4 components"),
    };

    fn default_value() -> Self {
        [C::default(); N]
    }

    fn components(&self) -> &[C] {
        self
    }

    fn from_components(components: &[C]) -> Self {
        let mut out = [C::default(); N];
        out.copy_from_slice(components);
        out
    }
}

/// Packs `values` tightly, element after element.
pub(crate) fn pack<'a, E: Element + 'a>(values: impl IntoIterator<Item = &'a E>) -> Vec<u8> {
    let mut out = Vec::new();
    for value in values {
        for &c in value.components() {
            c.write_le(&mut out);
        }
    }
    out
}
