mod marker;

use proc_macro::TokenStream;

#[proc_macro_derive(Component)]
pub fn derive_component(item: TokenStream) -> TokenStream {
    marker::derive_marker(item, "Component", "component")
}

#[proc_macro_derive(Resource)]
pub fn derive_resource(item: TokenStream) -> TokenStream {
    marker::derive_marker(item, "Resource", "resource")
}

#[proc_macro_derive(Event)]
pub fn derive_event(item: TokenStream) -> TokenStream {
    marker::derive_marker(item, "Event", "event")
}

#[proc_macro_derive(States)]
pub fn derive_states(item: TokenStream) -> TokenStream {
    marker::derive_marker(item, "States", "state")
}
