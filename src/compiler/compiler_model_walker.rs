//generic traversal of the output model
//a listener sees every node before its children and can keep, delete or replace it;
//the walker applies the answer to the parent's child slot

use crate::compiler::compiler_model::{ChildMut, Omo};

#[derive(Debug, Clone, PartialEq)]
pub enum Visit {
    NoResult,
    Delete,
    Replace(Omo),
}

pub trait ModelListener {
    //called first, typically matched on the node kind
    fn visit(&mut self, _omo: &mut Omo) -> Visit {
        Visit::NoResult
    }

    //called for every node right after visit
    fn visit_every(&mut self, _omo: &mut Omo) -> Visit {
        Visit::NoResult
    }
}

pub struct ModelWalker<'l, L: ModelListener> {
    listener: &'l mut L,
}

impl<'l, L: ModelListener> ModelWalker<'l, L> {
    pub fn new(listener: &'l mut L) -> Self {
        ModelWalker { listener }
    }

    //walk the whole tree, applying a result returned for the root itself
    pub fn walk_root(&mut self, root: &mut Omo) {
        match self.walk(root) {
            Visit::Replace(new) => *root = new,
            Visit::Delete | Visit::NoResult => {}
        }
    }

    //the children walked are those of the node as the listener left it,
    //a replacement returned here is not walked
    pub fn walk(&mut self, omo: &mut Omo) -> Visit {
        let specific = self.listener.visit(omo);
        let every = self.listener.visit_every(omo);

        for slot in omo.children_mut() {
            match slot {
                ChildMut::Single(single) => {
                    let result = match single.as_deref_mut() {
                        Some(child) => self.walk(child),
                        None => Visit::NoResult,
                    };
                    match result {
                        Visit::NoResult => {}
                        Visit::Delete => *single = None,
                        Visit::Replace(new) => *single = Some(Box::new(new)),
                    }
                }
                ChildMut::Sequence(list) => {
                    let mut i = 0;
                    while i < list.len() {
                        match self.walk(&mut list[i]) {
                            Visit::NoResult => i += 1,
                            Visit::Delete => {
                                // the successor shifted into slot i, visit it next
                                list.remove(i);
                            }
                            Visit::Replace(new) => {
                                list[i] = new;
                                i += 1;
                            }
                        }
                    }
                }
                ChildMut::Map(entries) => {
                    let keys: Vec<String> = entries.keys().cloned().collect();
                    for key in keys {
                        let result = match entries.get_mut(&key) {
                            Some(child) => self.walk(child),
                            None => continue,
                        };
                        match result {
                            Visit::NoResult => {}
                            Visit::Delete => {
                                entries.shift_remove(&key);
                            }
                            Visit::Replace(new) => {
                                entries.insert(key, new);
                            }
                        }
                    }
                }
            }
        }

        if specific != Visit::NoResult {
            specific
        } else {
            every
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compiler_model::*;
    use crate::semantic::semantic_types::WichType;

    fn print_stat(name: &str) -> Omo {
        Omo::PrintStat(PrintStat {
            expr: child(Omo::var(name, WichType::Int)),
            ty: Some(WichType::Int),
        })
    }

    fn names(stats: &[Omo]) -> Vec<String> {
        stats
            .iter()
            .filter_map(|s| match s {
                Omo::PrintStat(p) => match p.expr.as_deref() {
                    Some(Omo::VarRef(v)) => Some(v.name.clone()),
                    _ => Some("-".to_string()),
                },
                Omo::BreakStat => Some("break".to_string()),
                _ => None,
            })
            .collect()
    }

    struct DeleteNamed(&'static str, usize);

    impl ModelListener for DeleteNamed {
        fn visit(&mut self, omo: &mut Omo) -> Visit {
            match omo {
                Omo::PrintStat(p) => match p.expr.as_deref() {
                    Some(Omo::VarRef(v)) if v.name == self.0 => Visit::Delete,
                    _ => Visit::NoResult,
                },
                _ => Visit::NoResult,
            }
        }

        fn visit_every(&mut self, _omo: &mut Omo) -> Visit {
            self.1 += 1;
            Visit::NoResult
        }
    }

    #[test]
    fn deleting_consecutive_entries_visits_the_shifted_successor() {
        let mut block = Omo::Block(Block {
            stats: vec![print_stat("a"), print_stat("x"), print_stat("x"), print_stat("b")],
            ..Block::default()
        });
        let mut listener = DeleteNamed("x", 0);
        ModelWalker::new(&mut listener).walk_root(&mut block);
        let Omo::Block(block) = block else {
            panic!("expected block");
        };
        assert_eq!(names(&block.stats), vec!["a", "b"]);
        // children are walked before the delete is applied: block, 4 prints, 4 var refs
        assert_eq!(listener.1, 9);
    }

    struct ReplaceVars;

    impl ModelListener for ReplaceVars {
        fn visit_every(&mut self, omo: &mut Omo) -> Visit {
            match omo {
                Omo::VarRef(v) if v.name == "old" => Visit::Replace(Omo::var("new", v.ty)),
                Omo::VarRef(v) if v.name == "gone" => Visit::Delete,
                _ => Visit::NoResult,
            }
        }
    }

    #[test]
    fn single_children_are_replaced_or_cleared() {
        let mut block = Omo::Block(Block {
            stats: vec![print_stat("old"), print_stat("gone")],
            ..Block::default()
        });
        ModelWalker::new(&mut ReplaceVars).walk_root(&mut block);
        let Omo::Block(block) = block else {
            panic!("expected block");
        };
        assert_eq!(names(&block.stats), vec!["new", "-"]);
    }

    struct DropTemps;

    impl ModelListener for DropTemps {
        fn visit(&mut self, omo: &mut Omo) -> Visit {
            match omo {
                Omo::VarDecl(d) if d.is_temp => Visit::Delete,
                Omo::VarDecl(d) => Visit::Replace(Omo::VarDecl(VarDecl {
                    name: d.name.clone(),
                    ty: WichType::Float,
                    is_temp: false,
                })),
                _ => Visit::NoResult,
            }
        }
    }

    #[test]
    fn map_entries_keep_their_order() {
        let mut locals = indexmap::IndexMap::new();
        for (name, is_temp) in [("a", false), ("t0", true), ("b", false)] {
            locals.insert(
                name.to_string(),
                Omo::VarDecl(VarDecl {
                    name: name.to_string(),
                    ty: WichType::Int,
                    is_temp,
                }),
            );
        }
        let mut block = Omo::Block(Block {
            locals,
            stats: vec![Omo::BreakStat],
            ..Block::default()
        });
        ModelWalker::new(&mut DropTemps).walk_root(&mut block);
        let Omo::Block(block) = block else {
            panic!("expected block");
        };
        let keys: Vec<&String> = block.locals.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert!(block.locals.values().all(|d| matches!(d, Omo::VarDecl(v) if v.ty == WichType::Float)));
        assert_eq!(names(&block.stats), vec!["break"]);
    }
}
