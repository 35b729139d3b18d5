//output model -> template instantiations
//each omo is rendered by the template its group registers under the omo kind name.
//template parameters name the model children to render first: single children become one
//sub-instantiation, sequences a list and maps an ordered name -> instantiation map

use std::collections::{HashMap, HashSet};

use genco::prelude::*;
use indexmap::IndexMap;

use crate::compiler::compiler_model::{ChildRef, Omo};
use crate::error_handler::{ErrorHandler, ErrorKind};

pub enum Attr {
    Single(Tokens),
    Repeated(Vec<Tokens>),
    Map(IndexMap<String, Tokens>),
}

//rendered children of one omo, keyed by the template parameter naming them
#[derive(Default)]
pub struct TemplateArgs {
    attrs: HashMap<&'static str, Attr>,
}

impl TemplateArgs {
    pub fn single(&self, name: &str) -> Option<&Tokens> {
        match self.attrs.get(name) {
            Some(Attr::Single(tokens)) => Some(tokens),
            _ => None,
        }
    }

    pub fn repeated(&self, name: &str) -> &[Tokens] {
        match self.attrs.get(name) {
            Some(Attr::Repeated(list)) => list,
            _ => &[],
        }
    }

    pub fn map(&self, name: &str) -> Vec<&Tokens> {
        match self.attrs.get(name) {
            Some(Attr::Map(entries)) => entries.values().collect(),
            _ => Vec::new(),
        }
    }

    //rendered single child, or nothing when the child slot is empty
    pub fn get(&self, name: &str) -> Tokens {
        self.single(name).cloned().unwrap_or_default()
    }
}

pub type RenderFn = fn(&Omo, &TemplateArgs) -> Tokens;

pub struct Template {
    pub params: &'static [&'static str],
    pub render: RenderFn,
}

pub struct TemplateGroup {
    pub name: &'static str,
    templates: HashMap<&'static str, Template>,
}

impl TemplateGroup {
    pub fn new(name: &'static str) -> Self {
        TemplateGroup {
            name,
            templates: HashMap::new(),
        }
    }

    pub fn define(&mut self, kind: &'static str, params: &'static [&'static str], render: RenderFn) {
        self.templates.insert(kind, Template { params, render });
    }

    pub fn get(&self, kind: &str) -> Option<&Template> {
        self.templates.get(kind)
    }
}

pub struct ModelConverter<'g, 'e> {
    group: &'g TemplateGroup,
    errors: &'e mut ErrorHandler,
    warned: HashSet<&'static str>,
}

pub fn convert(model: &Omo, group: &TemplateGroup, errors: &mut ErrorHandler) -> Tokens {
    ModelConverter::new(group, errors).convert(model)
}

impl<'g, 'e> ModelConverter<'g, 'e> {
    pub fn new(group: &'g TemplateGroup, errors: &'e mut ErrorHandler) -> Self {
        ModelConverter {
            group,
            errors,
            warned: HashSet::new(),
        }
    }

    fn warn_once(&mut self, kind: &'static str, message: String) {
        if self.warned.insert(kind) {
            self.errors.internal_warning(ErrorKind::ModelMismatch, message);
        }
    }

    pub fn convert(&mut self, omo: &Omo) -> Tokens {
        let kind = omo.kind_name();
        let group = self.group;
        let Some(template) = group.get(kind) else {
            self.warn_once(kind, format!("no template for {} in group {}", kind, group.name));
            let marker = format!("[{} invalid]", kind);
            return quote!($marker);
        };

        let descriptor = omo.model_children();
        for param in template.params {
            if !descriptor.iter().any(|child| child.name == *param) {
                self.warn_once(
                    kind,
                    format!(
                        "template {}.{} has parameter {} but {} has no such model child",
                        group.name, kind, param, kind
                    ),
                );
            }
        }

        let mut args = TemplateArgs::default();
        for (desc, value) in descriptor.iter().zip(omo.children()) {
            if !template.params.contains(&desc.name) {
                continue;
            }
            let attr = match value {
                ChildRef::Single(Some(c)) => Attr::Single(self.convert(c)),
                ChildRef::Single(None) => continue,
                ChildRef::Sequence(list) => {
                    Attr::Repeated(list.iter().map(|c| self.convert(c)).collect())
                }
                ChildRef::Map(entries) => Attr::Map(
                    entries
                        .iter()
                        .map(|(name, c)| (name.clone(), self.convert(c)))
                        .collect(),
                ),
            };
            args.attrs.insert(desc.name, attr);
        }
        (template.render)(omo, &args)
    }
}
