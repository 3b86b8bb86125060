//! Ancestry - runner の継承チェーン宣言
//!
//! runner の型パラメータは、どこかの階層で `TaskRunner<TP, RD>` に束縛されます。
//! デコレータ（例: `Traced<R>`）は型を固定せずに 1 階層を追加するだけです。
//! `TypeResolver` はこのチェーンを下から順にたどります。

use std::borrow::Cow;

use super::describe::{Describe, TypeArg};

/// Name of the root capability every chain ends in.
pub const ROOT_CAPABILITY: &str = "TaskRunner";

/// How a level refers to its parent.
#[derive(Debug, Clone)]
pub enum Superclass {
    /// Names the parent but leaves its type parameters open.
    Unbound(Cow<'static, str>),
    /// Fixes the parent's type parameters.
    Bound {
        name: Cow<'static, str>,
        args: Vec<TypeArg>,
    },
}

#[derive(Debug, Clone)]
pub struct Level {
    pub type_name: Cow<'static, str>,
    /// `None` for the top of the chain.
    pub superclass: Option<Superclass>,
}

/// A runner's declared inheritance chain, most-derived level first.
///
/// ```ignore
/// let ancestry = Ancestry::new("billing::ChargeRunner")
///     .extends("billing::AbstractBillingRunner")
///     .binds(ROOT_CAPABILITY, [TypeArg::of::<Money>(), TypeArg::of::<Receipt>()]);
/// ```
#[derive(Debug, Clone)]
pub struct Ancestry {
    levels: Vec<Level>,
}

impl Ancestry {
    pub fn new(type_name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            levels: vec![Level {
                type_name: type_name.into(),
                superclass: None,
            }],
        }
    }

    /// A runner that binds `TaskRunner<TP, RD>` itself.
    pub fn direct<TP: Describe, RD: Describe>(type_name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(type_name).binds(
            ROOT_CAPABILITY,
            [TypeArg::of::<TP>(), TypeArg::of::<RD>()],
        )
    }

    /// A layer that re-declares `inner` without fixing any types.
    pub fn wrap(type_name: impl Into<Cow<'static, str>>, inner: Ancestry) -> Self {
        let parent = inner.subject().to_owned();
        let mut levels = Vec::with_capacity(inner.levels.len() + 1);
        levels.push(Level {
            type_name: type_name.into(),
            superclass: Some(Superclass::Unbound(parent.into())),
        });
        levels.extend(inner.levels);
        Self { levels }
    }

    /// The current top level extends `parent` without binding anything.
    pub fn extends(self, parent: impl Into<Cow<'static, str>>) -> Self {
        let parent = parent.into();
        self.push_parent(parent.clone(), Superclass::Unbound(parent))
    }

    /// The current top level binds `parent`'s type parameters to `args`.
    pub fn binds(
        self,
        parent: impl Into<Cow<'static, str>>,
        args: impl IntoIterator<Item = TypeArg>,
    ) -> Self {
        let parent = parent.into();
        let superclass = Superclass::Bound {
            name: parent.clone(),
            args: args.into_iter().collect(),
        };
        self.push_parent(parent, superclass)
    }

    fn push_parent(mut self, parent: Cow<'static, str>, superclass: Superclass) -> Self {
        if let Some(top) = self.levels.last_mut() {
            top.superclass = Some(superclass);
        }
        self.levels.push(Level {
            type_name: parent,
            superclass: None,
        });
        self
    }

    /// The most-derived type's name.
    pub fn subject(&self) -> &str {
        self.levels
            .first()
            .map_or(ROOT_CAPABILITY, |level| level.type_name.as_ref())
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }
}
