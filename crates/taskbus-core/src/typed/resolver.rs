//! TypeResolver - 宣言から TypeDescriptor を組み立てる
//!
//! # アルゴリズム
//! 1. Ancestry を最派生側からたどり、型引数を束縛している階層を探す
//!    （型を固定しない中間階層は読み飛ばす）
//! 2. 見つかった引数を 1 つずつ再帰的に解決する
//!
//! どちらの探索にも上限があり、超えた場合は `ConfigurationError` になります。

use super::ancestry::{Ancestry, Superclass};
use super::describe::{Describe, FieldDecl, RawDecl, TypeArg};
use super::descriptor::{FieldDescriptor, RawType, TypeDescriptor};
use crate::config::BusConfig;
use crate::domain::errors::ConfigurationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeResolver {
    max_ancestry_depth: usize,
    max_nesting_depth: usize,
}

impl Default for TypeResolver {
    fn default() -> Self {
        Self::from_config(&BusConfig::default())
    }
}

impl TypeResolver {
    pub fn new(max_ancestry_depth: usize, max_nesting_depth: usize) -> Self {
        Self {
            max_ancestry_depth,
            max_nesting_depth,
        }
    }

    pub fn from_config(config: &BusConfig) -> Self {
        Self::new(config.max_ancestry_depth, config.max_nesting_depth)
    }

    /// One descriptor per argument bound somewhere in `ancestry`.
    pub fn resolve(&self, ancestry: &Ancestry) -> Result<Vec<TypeDescriptor>, ConfigurationError> {
        let mut path = Vec::new();
        self.bound_arguments(ancestry)?
            .iter()
            .map(|arg| self.nested(arg, &[], 0, &mut path))
            .collect()
    }

    /// `TaskEnvelope<TP, RD>` for the runner described by `ancestry`.
    pub fn resolve_envelope(&self, ancestry: &Ancestry) -> Result<TypeDescriptor, ConfigurationError> {
        match <[TypeDescriptor; 2]>::try_from(self.resolve(ancestry)?) {
            Ok([param, result]) => Ok(TypeDescriptor::envelope(param, result)),
            Err(args) => Err(ConfigurationError::Arity {
                subject: ancestry.subject().to_owned(),
                expected: 2,
                found: args.len(),
            }),
        }
    }

    pub fn resolve_nested(&self, arg: &TypeArg) -> Result<TypeDescriptor, ConfigurationError> {
        self.nested(arg, &[], 0, &mut Vec::new())
    }

    pub fn describe<T: Describe>(&self) -> Result<TypeDescriptor, ConfigurationError> {
        self.resolve_nested(&T::declare())
    }

    fn bound_arguments<'a>(&self, ancestry: &'a Ancestry) -> Result<&'a [TypeArg], ConfigurationError> {
        let handler = || ancestry.subject().to_owned();
        let mut reached = ancestry.subject();
        for (depth, level) in ancestry.levels().iter().enumerate() {
            if depth >= self.max_ancestry_depth {
                return Err(ConfigurationError::AncestryTooDeep {
                    handler: handler(),
                    limit: self.max_ancestry_depth,
                });
            }
            reached = level.type_name.as_ref();
            match &level.superclass {
                Some(Superclass::Bound { args, .. }) => return Ok(args.as_slice()),
                Some(Superclass::Unbound(_)) => continue,
                // root capability or the declared chain simply ends here
                None => break,
            }
        }
        Err(ConfigurationError::UnboundParameters {
            handler: handler(),
            reached: reached.to_owned(),
        })
    }

    /// `scope` holds the resolved arguments of the innermost generic record,
    /// which is what `TypeArg::Param` refers to.
    fn nested(
        &self,
        arg: &TypeArg,
        scope: &[TypeDescriptor],
        depth: usize,
        path: &mut Vec<String>,
    ) -> Result<TypeDescriptor, ConfigurationError> {
        if depth > self.max_nesting_depth {
            return Err(ConfigurationError::NestingTooDeep {
                limit: self.max_nesting_depth,
                path: path.join("."),
            });
        }
        match arg {
            TypeArg::Scalar(scalar) => Ok(TypeDescriptor::Scalar(*scalar)),
            TypeArg::Deferred(declare) => self.nested(&declare(), &[], depth + 1, path),
            TypeArg::Param(index) => {
                scope
                    .get(*index)
                    .cloned()
                    .ok_or_else(|| ConfigurationError::UnboundPlaceholder {
                        index: *index,
                        path: path.join("."),
                    })
            }
            TypeArg::Record { name, fields } => Ok(TypeDescriptor::Record {
                name: name.clone(),
                fields: self.fields(fields, scope, depth, path)?,
            }),
            TypeArg::Parametric { raw, args } => {
                let mut resolved = Vec::with_capacity(args.len());
                for (i, arg) in args.iter().enumerate() {
                    path.push(format!("<{i}>"));
                    let descriptor = self.nested(arg, scope, depth + 1, path)?;
                    path.pop();
                    resolved.push(descriptor);
                }
                let raw = self.raw(raw, &resolved, depth, path)?;
                Ok(TypeDescriptor::Parametric {
                    raw,
                    args: resolved,
                })
            }
        }
    }

    fn raw(
        &self,
        raw: &RawDecl,
        args: &[TypeDescriptor],
        depth: usize,
        path: &mut Vec<String>,
    ) -> Result<RawType, ConfigurationError> {
        let (raw, expected) = match raw {
            RawDecl::Option => (RawType::Option, 1),
            RawDecl::List => (RawType::List, 1),
            RawDecl::Map => (RawType::Map, 2),
            RawDecl::Envelope => (RawType::Envelope, 2),
            // generic record: its layout sees the arguments just resolved
            RawDecl::Record { name, fields } => {
                let fields = self.fields(fields, args, depth, path)?;
                return Ok(RawType::Record {
                    name: name.clone(),
                    fields,
                });
            }
        };
        if args.len() != expected {
            return Err(ConfigurationError::Arity {
                subject: raw.name().to_owned(),
                expected,
                found: args.len(),
            });
        }
        Ok(raw)
    }

    fn fields(
        &self,
        fields: &[FieldDecl],
        scope: &[TypeDescriptor],
        depth: usize,
        path: &mut Vec<String>,
    ) -> Result<Vec<FieldDescriptor>, ConfigurationError> {
        let mut resolved = Vec::with_capacity(fields.len());
        for field in fields {
            path.push(field.name.to_string());
            let ty = self.nested(&field.ty, scope, depth + 1, path)?;
            path.pop();
            resolved.push(FieldDescriptor {
                name: field.name.clone(),
                ty,
                required: field.required,
            });
        }
        Ok(resolved)
    }
}
