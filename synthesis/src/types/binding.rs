use super::Ty;
use std::collections::BTreeMap;

/// Assignment of concrete types to generic parameter names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeBinding {
    bindings: BTreeMap<String, Ty>,
}

impl TypeBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `ty`, returning the previous binding if any.
    pub fn bind(&mut self, name: impl Into<String>, ty: Ty) -> Option<Ty> {
        self.bindings.insert(name.into(), ty)
    }

    pub fn get(&self, name: &str) -> Option<&Ty> {
        self.bindings.get(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Ty)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Infer the binding that turns `template` into `concrete`.
    ///
    /// Returns `None` if the two are not structurally compatible or a
    /// parameter would need two different types.
    pub fn infer(template: &Ty, concrete: &Ty) -> Option<Self> {
        let mut binding = Self::new();
        binding.unify(template, concrete).then_some(binding)
    }

    fn unify(&mut self, template: &Ty, concrete: &Ty) -> bool {
        match (template, concrete) {
            (Ty::Generic(param), _) => {
                if !param.admits(concrete) {
                    return false;
                }
                match self.bindings.get(&param.name) {
                    Some(existing) => existing == concrete,
                    None => {
                        self.bindings.insert(param.name.clone(), concrete.clone());
                        true
                    }
                }
            }
            (Ty::Fn(a), Ty::Fn(b)) => {
                a.params.len() == b.params.len()
                    && a.params.iter().zip(&b.params).all(|(x, y)| self.unify(x, y))
                    && match (&a.ret, &b.ret) {
                        (Some(x), Some(y)) => self.unify(x, y),
                        (None, None) => true,
                        _ => false,
                    }
            }
            _ => {
                let same_shape = match (template, concrete) {
                    (Ty::Struct(a), Ty::Struct(b)) | (Ty::Enum(a), Ty::Enum(b)) => a.name == b.name,
                    (Ty::Array { len: la, .. }, Ty::Array { len: lb, .. }) => la == lb,
                    (Ty::Ref { mutable: ma, .. }, Ty::Ref { mutable: mb, .. }) => ma == mb,
                    (Ty::Tuple(_), Ty::Tuple(_)) | (Ty::Slice(_), Ty::Slice(_)) => true,
                    (Ty::Prim(a), Ty::Prim(b)) => a == b,
                    (Ty::TraitObj(_), Ty::TraitObj(_)) => template.can_be_same_as(concrete),
                    _ => false,
                };
                let (tc, cc) = (template.children(), concrete.children());
                same_shape
                    && tc.len() == cc.len()
                    && tc.iter().zip(cc).all(|(x, y)| self.unify(x, y))
            }
        }
    }
}

impl FromIterator<(String, Ty)> for TypeBinding {
    fn from_iter<I: IntoIterator<Item = (String, Ty)>>(iter: I) -> Self {
        Self {
            bindings: iter.into_iter().collect(),
        }
    }
}
