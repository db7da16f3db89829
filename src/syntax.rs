//! Classification of Python syntax into the handful of node shapes that matter for routing.
//!
//! Route declarations only ever appear as assignments, augmented assignments, calls,
//! class definitions and decorated function definitions. Rather than an open-ended
//! visitor, [`collect_nodes`] flattens a module into a top-down sequence of [`Node`]s
//! and each framework visitor `match`es on that closed set.

use rustpython_parser::ast;
use std::collections::HashMap;

/// A routing-relevant syntax node.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    /// `targets = value` (also annotated assignments with a value)
    Assign {
        targets: &'a [ast::Expr],
        value: &'a ast::Expr,
    },
    /// `target += value`
    AugAssign {
        target: &'a ast::Expr,
        value: &'a ast::Expr,
    },
    /// Any call expression, outermost first
    Call(&'a ast::ExprCall),
    /// A class definition; its body is not flattened
    ClassDef(&'a ast::StmtClassDef),
    /// A (possibly async) function definition
    FunctionDef(FunctionNode<'a>),
}

/// Sync and async function definitions share everything the visitors need.
#[derive(Debug, Clone, Copy)]
pub struct FunctionNode<'a> {
    pub name: &'a str,
    pub decorators: &'a [ast::Expr],
    pub body: &'a [ast::Stmt],
}

/// Flattens `body` into routing nodes in source order.
///
/// Compound statements (`if`, `for`, `while`, `with`, `try`) and function bodies are
/// descended into so that conditional `urlpatterns +=` blocks and Flask application
/// factories are seen. Class bodies are left to the class-level visitors.
pub fn collect_nodes(body: &[ast::Stmt]) -> Vec<Node<'_>> {
    let mut nodes = Vec::new();
    for stmt in body {
        collect_stmt(stmt, &mut nodes);
    }
    nodes
}

fn collect_stmt<'a>(stmt: &'a ast::Stmt, nodes: &mut Vec<Node<'a>>) {
    match stmt {
        ast::Stmt::Assign(assign) => {
            nodes.push(Node::Assign {
                targets: &assign.targets,
                value: &assign.value,
            });
            collect_calls(&assign.value, nodes);
        }
        ast::Stmt::AnnAssign(assign) => {
            if let Some(value) = &assign.value {
                nodes.push(Node::Assign {
                    targets: std::slice::from_ref(assign.target.as_ref()),
                    value,
                });
                collect_calls(value, nodes);
            }
        }
        ast::Stmt::AugAssign(assign) => {
            nodes.push(Node::AugAssign {
                target: &assign.target,
                value: &assign.value,
            });
            collect_calls(&assign.value, nodes);
        }
        ast::Stmt::Expr(expr_stmt) => collect_calls(&expr_stmt.value, nodes),
        ast::Stmt::Return(ret) => {
            if let Some(value) = &ret.value {
                collect_calls(value, nodes);
            }
        }
        ast::Stmt::ClassDef(class_def) => nodes.push(Node::ClassDef(class_def)),
        ast::Stmt::FunctionDef(func) => {
            nodes.push(Node::FunctionDef(FunctionNode {
                name: func.name.as_str(),
                decorators: &func.decorator_list,
                body: &func.body,
            }));
            for stmt in &func.body {
                collect_stmt(stmt, nodes);
            }
        }
        ast::Stmt::AsyncFunctionDef(func) => {
            nodes.push(Node::FunctionDef(FunctionNode {
                name: func.name.as_str(),
                decorators: &func.decorator_list,
                body: &func.body,
            }));
            for stmt in &func.body {
                collect_stmt(stmt, nodes);
            }
        }
        ast::Stmt::If(if_stmt) => {
            collect_block(&if_stmt.body, nodes);
            collect_block(&if_stmt.orelse, nodes);
        }
        ast::Stmt::For(for_stmt) => {
            collect_block(&for_stmt.body, nodes);
            collect_block(&for_stmt.orelse, nodes);
        }
        ast::Stmt::AsyncFor(for_stmt) => {
            collect_block(&for_stmt.body, nodes);
            collect_block(&for_stmt.orelse, nodes);
        }
        ast::Stmt::While(while_stmt) => {
            collect_block(&while_stmt.body, nodes);
            collect_block(&while_stmt.orelse, nodes);
        }
        ast::Stmt::With(with_stmt) => collect_block(&with_stmt.body, nodes),
        ast::Stmt::AsyncWith(with_stmt) => collect_block(&with_stmt.body, nodes),
        ast::Stmt::Try(try_stmt) => {
            collect_block(&try_stmt.body, nodes);
            for handler in &try_stmt.handlers {
                let ast::ExceptHandler::ExceptHandler(handler) = handler;
                collect_block(&handler.body, nodes);
            }
            collect_block(&try_stmt.orelse, nodes);
            collect_block(&try_stmt.finalbody, nodes);
        }
        _ => {}
    }
}

fn collect_block<'a>(body: &'a [ast::Stmt], nodes: &mut Vec<Node<'a>>) {
    for stmt in body {
        collect_stmt(stmt, nodes);
    }
}

/// Pushes every call inside `expr`, outer calls before the calls in their arguments.
fn collect_calls<'a>(expr: &'a ast::Expr, nodes: &mut Vec<Node<'a>>) {
    match expr {
        ast::Expr::Call(call) => {
            nodes.push(Node::Call(call));
            collect_calls(&call.func, nodes);
            for arg in &call.args {
                collect_calls(arg, nodes);
            }
            for kw in &call.keywords {
                collect_calls(&kw.value, nodes);
            }
        }
        ast::Expr::Attribute(attr) => collect_calls(&attr.value, nodes),
        ast::Expr::List(list) => list.elts.iter().for_each(|e| collect_calls(e, nodes)),
        ast::Expr::Tuple(tuple) => tuple.elts.iter().for_each(|e| collect_calls(e, nodes)),
        ast::Expr::BinOp(bin_op) => {
            collect_calls(&bin_op.left, nodes);
            collect_calls(&bin_op.right, nodes);
        }
        _ => {}
    }
}

/// Returns the value of a literal string expression.
///
/// f-strings and other computed strings return `None`: paths that are not literal are
/// not resolved.
pub fn string_literal(expr: &ast::Expr) -> Option<&str> {
    match expr {
        ast::Expr::Constant(constant) => match &constant.value {
            ast::Constant::Str(s) => Some(s.as_str()),
            _ => None,
        },
        _ => None,
    }
}

/// Returns the value of a literal `True`/`False`.
pub fn bool_literal(expr: &ast::Expr) -> Option<bool> {
    match expr {
        ast::Expr::Constant(constant) => match constant.value {
            ast::Constant::Bool(b) => Some(b),
            _ => None,
        },
        _ => None,
    }
}

/// Collects the literal strings of a list or tuple; non-literal elements are dropped.
pub fn string_list(expr: &ast::Expr) -> Vec<String> {
    let elts = match expr {
        ast::Expr::List(list) => &list.elts,
        ast::Expr::Tuple(tuple) => &tuple.elts,
        _ => return Vec::new(),
    };
    elts.iter()
        .filter_map(string_literal)
        .map(str::to_string)
        .collect()
}

/// Looks up a keyword argument of a call by name.
pub fn keyword<'a>(call: &'a ast::ExprCall, name: &str) -> Option<&'a ast::Expr> {
    call.keywords
        .iter()
        .find(|kw| kw.arg.as_ref().map(|a| a.as_str()) == Some(name))
        .map(|kw| &kw.value)
}

/// Simple name of a `Name` or the last segment of an `Attribute` chain.
pub fn simple_name(expr: &ast::Expr) -> Option<&str> {
    match expr {
        ast::Expr::Name(name) => Some(name.id.as_str()),
        ast::Expr::Attribute(attr) => Some(attr.attr.as_str()),
        _ => None,
    }
}

/// Variable name when `expr` is a bare `Name`.
pub fn name_id(expr: &ast::Expr) -> Option<&str> {
    match expr {
        ast::Expr::Name(name) => Some(name.id.as_str()),
        _ => None,
    }
}

/// Full dotted text of a `Name`/`Attribute` chain, e.g. `viewsets.ModelViewSet`.
pub fn dotted_name(expr: &ast::Expr) -> Option<String> {
    match expr {
        ast::Expr::Name(name) => Some(name.id.to_string()),
        ast::Expr::Attribute(attr) => {
            dotted_name(&attr.value).map(|base| format!("{}.{}", base, attr.attr.as_str()))
        }
        _ => None,
    }
}

/// When `call` is `receiver.method(...)` with a bare-name receiver, returns both names.
pub fn method_call(call: &ast::ExprCall) -> Option<(&str, &str)> {
    match call.func.as_ref() {
        ast::Expr::Attribute(attr) => {
            name_id(&attr.value).map(|receiver| (receiver, attr.attr.as_str()))
        }
        _ => None,
    }
}

/// First line of the docstring of a function or class body.
pub fn docstring(body: &[ast::Stmt]) -> Option<String> {
    let first = body.first()?;
    if let ast::Stmt::Expr(expr_stmt) = first {
        let text = string_literal(&expr_stmt.value)?;
        return text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string);
    }
    None
}

/// A name bound by an import statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedName {
    /// Module the name comes from (`views` in `from .views import X`)
    pub module: String,
    /// Number of leading dots of a relative import
    pub level: u32,
    /// The imported attribute, `None` for `import module`
    pub symbol: Option<String>,
}

impl ImportedName {
    /// Dotted path of the module that `local` refers to, assuming it is bound to a module.
    ///
    /// `from . import views` gives `views`, `from api import views` gives `api.views` and a
    /// bare `import blog.urls` binds `blog` to the top-level package.
    pub fn module_path(&self, local: &str) -> String {
        match &self.symbol {
            Some(symbol) if self.module.is_empty() => symbol.clone(),
            Some(symbol) => format!("{}.{}", self.module, symbol),
            None if self.module.starts_with(&format!("{}.", local)) => local.to_string(),
            None => self.module.clone(),
        }
    }
}

/// Maps every locally bound name to where it was imported from.
pub fn collect_imports(body: &[ast::Stmt]) -> HashMap<String, ImportedName> {
    let mut imports = HashMap::new();
    for stmt in body {
        match stmt {
            ast::Stmt::Import(import) => {
                for alias in &import.names {
                    let module = alias.name.to_string();
                    let local = alias
                        .asname
                        .as_ref()
                        .map(|a| a.to_string())
                        .unwrap_or_else(|| {
                            module.split('.').next().unwrap_or(&module).to_string()
                        });
                    imports.insert(
                        local,
                        ImportedName {
                            module,
                            level: 0,
                            symbol: None,
                        },
                    );
                }
            }
            ast::Stmt::ImportFrom(import) => {
                let module = import
                    .module
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_default();
                let level = import.level.as_ref().map(|l| l.to_u32()).unwrap_or(0);
                for alias in &import.names {
                    let symbol = alias.name.to_string();
                    let local = alias
                        .asname
                        .as_ref()
                        .map(|a| a.to_string())
                        .unwrap_or_else(|| symbol.clone());
                    imports.insert(
                        local,
                        ImportedName {
                            module: module.clone(),
                            level,
                            symbol: Some(symbol),
                        },
                    );
                }
            }
            _ => {}
        }
    }
    imports
}
