// Call-site extraction from parsed Rust files.

use syn::punctuated::Punctuated;
use syn::visit::{self, Visit};
use syn::{
    Expr, ExprCall, ExprClosure, ExprMethodCall, ImplItemFn, ItemConst, ItemFn, ItemImpl, ItemMod,
    ItemStatic, ItemTrait, Macro, Token, TraitItemFn,
};

use crate::domain::callgraph::FunctionId;
use crate::domain::index::{package_of, type_ident, SourceFile, SymbolIndex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub caller: FunctionId,
    pub callee: FunctionId,
    pub callee_synthetic: bool,
}

/// Functions defined in one file and the call sites inside them, in
/// source order.
#[derive(Debug, Default)]
pub struct FileCalls {
    pub definitions: Vec<(FunctionId, bool)>,
    pub sites: Vec<CallSite>,
}

struct Frame {
    id: FunctionId,
    closures: usize,
}

pub struct CallVisitor<'a> {
    index: &'a SymbolIndex,
    initializer: &'a str,
    scope: Vec<String>,
    impl_type: Option<String>,
    frames: Vec<Frame>,
    out: FileCalls,
}

impl<'a> CallVisitor<'a> {
    /// Call sites of `ast`. Calls made while initializing a `const` or
    /// `static` are attributed to the module's `initializer` function.
    pub fn collect(
        index: &'a SymbolIndex,
        initializer: &'a str,
        source: &SourceFile,
        ast: &syn::File,
    ) -> FileCalls {
        let mut visitor = CallVisitor {
            index,
            initializer,
            scope: source.scope(),
            impl_type: None,
            frames: Vec::new(),
            out: FileCalls::default(),
        };
        visitor.visit_file(ast);
        visitor.out
    }

    fn package(&self) -> String {
        package_of(&self.scope)
    }

    fn member_name(&self, name: String) -> String {
        match &self.impl_type {
            Some(owner) => format!("{}.{}", owner, name),
            None => name,
        }
    }

    fn enter(&mut self, id: FunctionId, synthetic: bool) {
        self.out.definitions.push((id.clone(), synthetic));
        self.frames.push(Frame { id, closures: 0 });
    }

    fn leave(&mut self) {
        self.frames.pop();
    }

    fn record(&mut self, callee: FunctionId, callee_synthetic: bool) {
        let Some(frame) = self.frames.last() else {
            return;
        };
        self.out.sites.push(CallSite {
            caller: frame.id.clone(),
            callee,
            callee_synthetic,
        });
    }

    fn with_impl_type<F: FnOnce(&mut Self)>(&mut self, owner: Option<String>, body: F) {
        let previous = std::mem::replace(&mut self.impl_type, owner);
        body(self);
        self.impl_type = previous;
    }

    fn in_initializer<F: FnOnce(&mut Self)>(&mut self, body: F) {
        let id = FunctionId::new(self.package(), self.initializer);
        self.enter(id, false);
        body(self);
        self.leave();
    }
}

impl<'ast> Visit<'ast> for CallVisitor<'_> {
    fn visit_item_mod(&mut self, node: &'ast ItemMod) {
        // `mod foo;` bodies live in their own files.
        if node.content.is_none() {
            return;
        }
        self.scope.push(node.ident.to_string());
        let outer_impl = self.impl_type.take();
        visit::visit_item_mod(self, node);
        self.impl_type = outer_impl;
        self.scope.pop();
    }

    fn visit_item_impl(&mut self, node: &'ast ItemImpl) {
        self.with_impl_type(type_ident(&node.self_ty), |v| visit::visit_item_impl(v, node));
    }

    fn visit_item_trait(&mut self, node: &'ast ItemTrait) {
        self.with_impl_type(Some(node.ident.to_string()), |v| visit::visit_item_trait(v, node));
    }

    fn visit_item_fn(&mut self, node: &'ast ItemFn) {
        let id = FunctionId::new(self.package(), node.sig.ident.to_string());
        self.with_impl_type(None, |v| {
            v.enter(id, false);
            visit::visit_item_fn(v, node);
            v.leave();
        });
    }

    fn visit_impl_item_fn(&mut self, node: &'ast ImplItemFn) {
        let id = FunctionId::new(self.package(), self.member_name(node.sig.ident.to_string()));
        self.enter(id, false);
        visit::visit_impl_item_fn(self, node);
        self.leave();
    }

    fn visit_trait_item_fn(&mut self, node: &'ast TraitItemFn) {
        if node.default.is_none() {
            return;
        }
        let id = FunctionId::new(self.package(), self.member_name(node.sig.ident.to_string()));
        self.enter(id, false);
        visit::visit_trait_item_fn(self, node);
        self.leave();
    }

    fn visit_item_const(&mut self, node: &'ast ItemConst) {
        self.in_initializer(|v| visit::visit_item_const(v, node));
    }

    fn visit_item_static(&mut self, node: &'ast ItemStatic) {
        self.in_initializer(|v| visit::visit_item_static(v, node));
    }

    fn visit_expr_closure(&mut self, node: &'ast ExprClosure) {
        let id = match self.frames.last_mut() {
            Some(parent) => {
                parent.closures += 1;
                FunctionId::new(
                    parent.id.package.clone(),
                    format!("{}${}", parent.id.name, parent.closures),
                )
            }
            None => {
                visit::visit_expr_closure(self, node);
                return;
            }
        };
        self.record(id.clone(), true);
        self.enter(id, true);
        visit::visit_expr_closure(self, node);
        self.leave();
    }

    fn visit_expr_call(&mut self, node: &'ast ExprCall) {
        // Arguments run before the call itself.
        visit::visit_expr_call(self, node);

        let Expr::Path(path) = &*node.func else {
            return;
        };
        if path.qself.is_some() {
            return;
        }
        let segments: Vec<String> =
            path.path.segments.iter().map(|s| s.ident.to_string()).collect();
        if let Some(callee) = self
            .index
            .resolve_call(&self.scope, self.impl_type.as_deref(), &segments)
        {
            self.record(callee, false);
        }
    }

    fn visit_expr_method_call(&mut self, node: &'ast ExprMethodCall) {
        visit::visit_expr_method_call(self, node);

        let method = node.method.to_string();
        if let (Some(owner), Expr::Path(receiver)) = (&self.impl_type, &*node.receiver) {
            if receiver.path.is_ident("self") {
                let own = FunctionId::new(self.package(), format!("{}.{}", owner, method));
                if self.index.contains_function(&own) {
                    self.record(own, false);
                    return;
                }
            }
        }
        // Unknown receiver type: every method of that name is a candidate.
        for candidate in self.index.find_methods_by_name(&method) {
            self.record(candidate, false);
        }
    }

    fn visit_macro(&mut self, node: &'ast Macro) {
        // Expression-list macros (`println!`, `vec!`, `assert_eq!`) still
        // contain calls; anything else is opaque.
        let Ok(args) = node.parse_body_with(Punctuated::<Expr, Token![,]>::parse_terminated) else {
            return;
        };
        for expr in &args {
            Visit::visit_expr(self, expr);
        }
    }
}
