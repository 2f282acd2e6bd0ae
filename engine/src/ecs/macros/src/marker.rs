use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{DeriveInput, Ident, parse_macro_input};

/// Emit a marker trait impl for the annotated type.
///
/// All of the engine's marker traits (`Component`, `Resource`, `Event`,
/// `States`) are data-free, so the derives share one expansion: an empty impl
/// of `cadence_engine::ecs::<module>::<trait>` with the input's generics
/// carried over. Trait bounds beyond the marker itself (e.g. `Clone + Eq +
/// Hash` for `States`) are checked at the impl site by the trait definition,
/// so a missing derive surfaces as a normal trait-bound error.
pub(crate) fn derive_marker(item: TokenStream, trait_name: &str, module: &str) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let trait_ident = Ident::new(trait_name, Span::call_site());
    let module_ident = Ident::new(module, Span::call_site());

    let expanded = quote! {
        impl #impl_generics cadence_engine::ecs::#module_ident::#trait_ident for #name #ty_generics #where_clause {}
    };

    expanded.into()
}
