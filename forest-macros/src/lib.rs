extern crate proc_macro;
use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::{parse_macro_input, Ident, ItemFn, Token};

const ALL_STRATEGIES: [&str; 5] = [
    "NoLocks",
    "ParentLockOnly",
    "ParentAndSiblingLocks",
    "SiblingLocksBackoff",
    "ChainedLocks",
];

/// Turn `fn name(strategy: RemovalStrategy)` into a module `name` holding one `#[test]`
/// per strategy, e.g. `name::chained_locks`.
///
/// With no arguments every strategy gets a test; otherwise list the variants to cover:
/// `#[each_strategy(SiblingLocksBackoff, ChainedLocks)]`. `RemovalStrategy` must be in
/// scope where the attribute is used. Attributes on the function (`#[cfg_attr(..)]`,
/// `#[should_panic]`, ...) are copied onto every generated test.
#[proc_macro_attribute]
pub fn each_strategy(attr: TokenStream, item: TokenStream) -> TokenStream {
    let selected = parse_macro_input!(attr with Punctuated::<Ident, Token![,]>::parse_terminated);
    let input_fn = parse_macro_input!(item as ItemFn);
    let fn_name = &input_fn.sig.ident;
    let fn_attrs = &input_fn.attrs;
    let fn_sig = &input_fn.sig;
    let fn_block = &input_fn.block;

    let variants: Vec<Ident> = if selected.is_empty() {
        ALL_STRATEGIES
            .iter()
            .map(|name| Ident::new(name, Span::call_site()))
            .collect()
    } else {
        selected.into_iter().collect()
    };

    for variant in &variants {
        if !ALL_STRATEGIES.contains(&variant.to_string().as_str()) {
            return syn::Error::new(variant.span(), "unknown removal strategy")
                .to_compile_error()
                .into();
        }
    }

    let tests = variants.iter().map(|variant| {
        let test_name = Ident::new(&snake_case(&variant.to_string()), variant.span());
        quote! {
            #(#fn_attrs)*
            #[test]
            fn #test_name() {
                #fn_name(RemovalStrategy::#variant);
            }
        }
    });

    let expanded = quote! {
        mod #fn_name {
            #[allow(unused_imports)]
            use super::*;

            #fn_sig
            #fn_block

            #(#tests)*
        }
    };

    TokenStream::from(expanded)
}

fn snake_case(camel: &str) -> String {
    let mut out = String::with_capacity(camel.len() + 4);
    for (i, c) in camel.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
