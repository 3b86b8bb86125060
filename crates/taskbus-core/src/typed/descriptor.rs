//! TypeDescriptor - 解決済みの実行時型
//!
//! [`TypeResolver`](super::resolver::TypeResolver) が作り、以後は変更しません。
//! 等価性は構造的なので、同じ形を宣言した runner 同士は等しい descriptor を得ます。

use std::borrow::Cow;
use std::fmt;

/// Built-in non-generic shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    /// Accepts any value. The type-erased fallback uses this.
    Any,
    Unit,
    Bool,
    /// Fixed-width integer. `bits` is 8, 16, 32 or 64.
    Integer { signed: bool, bits: u8 },
    Float,
    /// A single Unicode scalar value, sent as a one-character string.
    Char,
    Text,
}

impl Scalar {
    pub const I32: Self = Self::Integer { signed: true, bits: 32 };
    pub const I64: Self = Self::Integer { signed: true, bits: 64 };
    pub const U8: Self = Self::Integer { signed: false, bits: 8 };
    pub const U32: Self = Self::Integer { signed: false, bits: 32 };
    pub const U64: Self = Self::Integer { signed: false, bits: 64 };

    pub fn name(self) -> &'static str {
        match self {
            Self::Any => "Any",
            Self::Unit => "Unit",
            Self::Bool => "Bool",
            Self::Integer { signed: true, bits: 8 } => "Int8",
            Self::Integer { signed: true, bits: 16 } => "Int16",
            Self::Integer { signed: true, bits: 32 } => "Int32",
            Self::Integer { signed: true, .. } => "Int64",
            Self::Integer { signed: false, bits: 8 } => "UInt8",
            Self::Integer { signed: false, bits: 16 } => "UInt16",
            Self::Integer { signed: false, bits: 32 } => "UInt32",
            Self::Integer { signed: false, .. } => "UInt64",
            Self::Float => "Float",
            Self::Char => "Char",
            Self::Text => "Text",
        }
    }

    /// Inclusive bounds of an integer shape; `None` for everything else.
    pub fn integer_range(self) -> Option<(i128, i128)> {
        let Self::Integer { signed, bits } = self else {
            return None;
        };
        let bits = u32::from(bits.clamp(1, 64));
        if signed {
            let half = 1_i128 << (bits - 1);
            Some((-half, half - 1))
        } else {
            Some((0, (1_i128 << bits) - 1))
        }
    }
}

/// Generic type constructors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RawType {
    Option,
    List,
    Map,
    /// `TaskEnvelope<TP, RD>`.
    Envelope,
    /// User-defined generic record. `fields` is the layout already
    /// instantiated with the descriptor's arguments.
    Record {
        name: Cow<'static, str>,
        fields: Vec<FieldDescriptor>,
    },
}

impl RawType {
    pub fn name(&self) -> &str {
        match self {
            Self::Option => "Option",
            Self::List => "List",
            Self::Map => "Map",
            Self::Envelope => "TaskEnvelope",
            Self::Record { name, .. } => name.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    pub name: Cow<'static, str>,
    pub ty: TypeDescriptor,
    pub required: bool,
}

impl FieldDescriptor {
    /// Whether a body may leave this field out.
    pub fn may_be_absent(&self) -> bool {
        !self.required || self.ty.is_nullable()
    }
}

/// Resolved type tree: a leaf or a raw type applied to arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Scalar(Scalar),
    /// Named non-generic record (leaf).
    Record {
        name: Cow<'static, str>,
        fields: Vec<FieldDescriptor>,
    },
    Parametric {
        raw: RawType,
        args: Vec<TypeDescriptor>,
    },
}

impl TypeDescriptor {
    pub const ANY: Self = Self::Scalar(Scalar::Any);

    pub fn envelope(param: Self, result: Self) -> Self {
        Self::Parametric {
            raw: RawType::Envelope,
            args: vec![param, result],
        }
    }

    /// `TaskEnvelope<Any, Any>`: what a receiver decodes with when it has no
    /// registered shape for a task class.
    pub fn erased_envelope() -> Self {
        Self::envelope(Self::ANY, Self::ANY)
    }

    pub fn is_leaf(&self) -> bool {
        !matches!(self, Self::Parametric { .. })
    }

    pub fn args(&self) -> &[TypeDescriptor] {
        match self {
            Self::Parametric { args, .. } => args,
            _ => &[],
        }
    }

    /// Parametric layers along the deepest argument path. Leaves are 0.
    pub fn depth(&self) -> usize {
        match self {
            Self::Parametric { args, .. } => 1 + args.iter().map(Self::depth).max().unwrap_or(0),
            _ => 0,
        }
    }

    /// Whether `null` (or a missing field) satisfies this type.
    pub fn is_nullable(&self) -> bool {
        matches!(
            self,
            Self::Scalar(Scalar::Any | Scalar::Unit)
                | Self::Parametric {
                    raw: RawType::Option,
                    ..
                }
        )
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Scalar(scalar) => scalar.name(),
            Self::Record { name, .. } => name.as_ref(),
            Self::Parametric { raw, .. } => raw.name(),
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())?;
        if let Self::Parametric { args, .. } = self {
            f.write_str("<")?;
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_of(item: TypeDescriptor) -> TypeDescriptor {
        TypeDescriptor::Parametric {
            raw: RawType::List,
            args: vec![item],
        }
    }

    #[test]
    fn display_renders_nested_arguments() {
        let d = TypeDescriptor::envelope(
            list_of(TypeDescriptor::Scalar(Scalar::I64)),
            TypeDescriptor::Scalar(Scalar::Text),
        );
        assert_eq!(d.to_string(), "TaskEnvelope<List<Int64>, Text>");
    }

    #[test]
    fn depth_counts_parametric_layers() {
        assert_eq!(TypeDescriptor::ANY.depth(), 0);
        assert_eq!(TypeDescriptor::erased_envelope().depth(), 1);

        let nested = TypeDescriptor::envelope(
            list_of(list_of(TypeDescriptor::Scalar(Scalar::Bool))),
            TypeDescriptor::Scalar(Scalar::Unit),
        );
        assert_eq!(nested.depth(), 3);
    }

    #[test]
    fn equality_is_structural() {
        let a = list_of(TypeDescriptor::Scalar(Scalar::Text));
        let b = list_of(TypeDescriptor::Scalar(Scalar::Text));
        let c = list_of(TypeDescriptor::Scalar(Scalar::I64));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn integer_ranges_follow_width_and_sign() {
        assert_eq!(Scalar::U8.integer_range(), Some((0, 255)));
        assert_eq!(Scalar::I32.integer_range(), Some((i128::from(i32::MIN), i128::from(i32::MAX))));
        assert_eq!(Scalar::U64.integer_range(), Some((0, i128::from(u64::MAX))));
        assert_eq!(Scalar::Text.integer_range(), None);
        assert_ne!(Scalar::I64, Scalar::U64);
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let field = FieldDescriptor {
            name: "note".into(),
            ty: TypeDescriptor::Parametric {
                raw: RawType::Option,
                args: vec![TypeDescriptor::Scalar(Scalar::Text)],
            },
            required: true,
        };
        assert!(field.may_be_absent());

        let strict = FieldDescriptor {
            ty: TypeDescriptor::Scalar(Scalar::Text),
            ..field
        };
        assert!(!strict.may_be_absent());
    }
}
