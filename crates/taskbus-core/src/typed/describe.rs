//! Describe - 型スキーマの宣言
//!
//! `TypeArg` は未解決の型宣言です。`TypeResolver` が深さ制限つきで展開し、
//! `TypeDescriptor` に変換します。
//!
//! # 使用例
//! ```ignore
//! #[derive(Serialize, Deserialize)]
//! struct Money {
//!     amount: u64,
//!     currency: String,
//! }
//!
//! impl Describe for Money {
//!     fn declare() -> TypeArg {
//!         TypeArg::record(
//!             "billing.Money",
//!             [FieldDecl::of::<u64>("amount"), FieldDecl::of::<String>("currency")],
//!         )
//!     }
//! }
//! ```

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use super::descriptor::Scalar;

/// Declares the wire shape of a type.
///
/// Containers and scalars from `std` are covered below; payload structs
/// implement this by hand, usually with [`TypeArg::record`] or
/// [`TypeArg::generic`].
pub trait Describe {
    fn declare() -> TypeArg;
}

/// Unresolved type declaration.
#[derive(Debug, Clone)]
pub enum TypeArg {
    Scalar(Scalar),
    Record {
        name: Cow<'static, str>,
        fields: Vec<FieldDecl>,
    },
    Parametric {
        raw: RawDecl,
        args: Vec<TypeArg>,
    },
    /// The `i`-th argument of the enclosing generic record.
    Param(usize),
    /// Another type's declaration, expanded by the resolver on demand.
    /// Self-referential types stay finite this way.
    Deferred(fn() -> TypeArg),
}

/// Declared generic type constructors.
#[derive(Debug, Clone)]
pub enum RawDecl {
    Option,
    List,
    Map,
    Envelope,
    Record {
        name: Cow<'static, str>,
        fields: Vec<FieldDecl>,
    },
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: Cow<'static, str>,
    pub ty: TypeArg,
    pub required: bool,
}

impl TypeArg {
    pub fn of<T: Describe>() -> Self {
        Self::Deferred(T::declare)
    }

    pub fn record(
        name: impl Into<Cow<'static, str>>,
        fields: impl IntoIterator<Item = FieldDecl>,
    ) -> Self {
        Self::Record {
            name: name.into(),
            fields: fields.into_iter().collect(),
        }
    }

    /// A generic record applied to `args`. Field types refer to the
    /// arguments with [`TypeArg::Param`].
    pub fn generic(
        name: impl Into<Cow<'static, str>>,
        fields: impl IntoIterator<Item = FieldDecl>,
        args: impl IntoIterator<Item = TypeArg>,
    ) -> Self {
        Self::Parametric {
            raw: RawDecl::Record {
                name: name.into(),
                fields: fields.into_iter().collect(),
            },
            args: args.into_iter().collect(),
        }
    }

    pub fn option(inner: TypeArg) -> Self {
        Self::Parametric {
            raw: RawDecl::Option,
            args: vec![inner],
        }
    }

    pub fn list(item: TypeArg) -> Self {
        Self::Parametric {
            raw: RawDecl::List,
            args: vec![item],
        }
    }

    pub fn map(key: TypeArg, value: TypeArg) -> Self {
        Self::Parametric {
            raw: RawDecl::Map,
            args: vec![key, value],
        }
    }

    pub fn envelope(param: TypeArg, result: TypeArg) -> Self {
        Self::Parametric {
            raw: RawDecl::Envelope,
            args: vec![param, result],
        }
    }
}

impl FieldDecl {
    pub fn new(name: impl Into<Cow<'static, str>>, ty: TypeArg) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
        }
    }

    pub fn of<T: Describe>(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, TypeArg::of::<T>())
    }

    /// Mark the field as skippable (`#[serde(default)]` on the Rust side).
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

macro_rules! describe_scalar {
    ($scalar:ident => $($ty:ty),+ $(,)?) => {
        $(
            impl Describe for $ty {
                fn declare() -> TypeArg {
                    TypeArg::Scalar(Scalar::$scalar)
                }
            }
        )+
    };
}

describe_scalar!(Unit => ());
describe_scalar!(Bool => bool);
describe_scalar!(Float => f32, f64);
describe_scalar!(Char => char);
describe_scalar!(Text => String);

macro_rules! describe_integer {
    ($($ty:ty => $signed:expr),+ $(,)?) => {
        $(
            impl Describe for $ty {
                fn declare() -> TypeArg {
                    TypeArg::Scalar(Scalar::Integer {
                        signed: $signed,
                        bits: <$ty>::BITS as u8,
                    })
                }
            }
        )+
    };
}

describe_integer!(
    i8 => true, i16 => true, i32 => true, i64 => true, isize => true,
    u8 => false, u16 => false, u32 => false, u64 => false, usize => false,
);
describe_scalar!(Any => serde_json::Value);

impl<T: Describe> Describe for Option<T> {
    fn declare() -> TypeArg {
        TypeArg::option(TypeArg::of::<T>())
    }
}

impl<T: Describe> Describe for Vec<T> {
    fn declare() -> TypeArg {
        TypeArg::list(TypeArg::of::<T>())
    }
}

impl<T: Describe> Describe for Box<T> {
    fn declare() -> TypeArg {
        T::declare()
    }
}

impl<K: Describe, V: Describe, S> Describe for HashMap<K, V, S> {
    fn declare() -> TypeArg {
        TypeArg::map(TypeArg::of::<K>(), TypeArg::of::<V>())
    }
}

impl<K: Describe, V: Describe> Describe for BTreeMap<K, V> {
    fn declare() -> TypeArg {
        TypeArg::map(TypeArg::of::<K>(), TypeArg::of::<V>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containers_defer_their_arguments() {
        let TypeArg::Parametric { raw, args } = Vec::<u32>::declare() else {
            panic!("Vec must declare a parametric type");
        };
        assert!(matches!(raw, RawDecl::List));
        assert!(matches!(args.as_slice(), [TypeArg::Deferred(_)]));
    }

    #[test]
    fn box_is_transparent() {
        assert!(matches!(
            Box::<bool>::declare(),
            TypeArg::Scalar(Scalar::Bool)
        ));
    }

    #[test]
    fn integers_keep_sign_and_width() {
        assert!(matches!(u64::declare(), TypeArg::Scalar(Scalar::U64)));
        assert!(matches!(i32::declare(), TypeArg::Scalar(Scalar::I32)));
        assert!(matches!(char::declare(), TypeArg::Scalar(Scalar::Char)));
    }

    #[test]
    fn optional_clears_required() {
        let field = FieldDecl::of::<u32>("retries").optional();
        assert!(!field.required);
        assert_eq!(field.name, "retries");
    }
}
