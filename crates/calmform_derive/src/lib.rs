use std::collections::HashMap;

use proc_macro::TokenStream;
use proc_macro2::{Ident, Span, TokenStream as TokenStream2};
use proc_macro_crate::{FoundCrate, crate_name};
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields, parse_macro_input};

/// Derives `calmform::form::FormModel` for a struct with named fields.
///
/// For `struct Signup { user_name: String }` this emits `SignupFields` with a
/// `user_name()` accessor returning the zero-sized `SignupUserNameLens`, and a
/// key table listing the fields in declaration order.
#[proc_macro_derive(FormModel)]
pub fn derive_form_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_form_model(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_form_model(input: DeriveInput) -> syn::Result<TokenStream2> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            input.ident,
            "FormModel derive supports only non-generic structs",
        ));
    }

    let model_ident = input.ident;
    let fields_struct_ident = format_ident!("{model_ident}Fields");

    let named_fields = match input.data {
        Data::Struct(data) => match data.fields {
            Fields::Named(fields) => fields.named,
            _ => {
                return Err(syn::Error::new(
                    Span::call_site(),
                    "FormModel derive requires a struct with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new(
                Span::call_site(),
                "FormModel derive is only supported on structs",
            ));
        }
    };

    let calmform = calmform_path();
    let mut lens_defs = Vec::new();
    let mut fields_methods = Vec::new();
    let mut field_names = Vec::new();
    let mut lens_owners = HashMap::<String, String>::new();

    for field in named_fields {
        let Some(field_ident) = field.ident else {
            continue;
        };
        let field_ty = field.ty;
        let field_name = field_ident.unraw().to_string();
        let lens_ident = format_ident!("{model_ident}{}Lens", to_pascal_case(&field_name));
        if let Some(owner) = lens_owners.insert(lens_ident.to_string(), field_name.clone()) {
            return Err(syn::Error::new_spanned(
                field_ident,
                format!(
                    "field `{field_name}` would generate lens `{lens_ident}`, \
                     which field `{owner}` already uses; rename one of them"
                ),
            ));
        }

        lens_defs.push(quote! {
            #[derive(Clone, Copy, Debug, Default)]
            pub struct #lens_ident;

            impl #calmform::form::FieldLens<#model_ident> for #lens_ident {
                type Value = #field_ty;

                fn key(self) -> #calmform::form::FieldKey {
                    #calmform::form::FieldKey::new(#field_name)
                }

                fn get<'a>(self, model: &'a #model_ident) -> &'a Self::Value {
                    &model.#field_ident
                }

                fn set(self, model: &mut #model_ident, value: Self::Value) {
                    model.#field_ident = value;
                }
            }
        });

        fields_methods.push(quote! {
            pub const fn #field_ident(&self) -> #lens_ident {
                #lens_ident
            }
        });

        field_names.push(field_name);
    }

    Ok(quote! {
        #[derive(Clone, Copy, Debug, Default)]
        pub struct #fields_struct_ident;

        impl #fields_struct_ident {
            #(#fields_methods)*
        }

        impl #calmform::form::FormModel for #model_ident {
            type Fields = #fields_struct_ident;

            fn fields() -> Self::Fields {
                #fields_struct_ident
            }

            fn field_keys() -> &'static [#calmform::form::FieldKey] {
                const KEYS: &[#calmform::form::FieldKey] = &[
                    #(#calmform::form::FieldKey::new(#field_names)),*
                ];
                KEYS
            }
        }

        #(#lens_defs)*
    })
}

fn calmform_path() -> TokenStream2 {
    match crate_name("calmform") {
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Ok(FoundCrate::Itself) => quote!(crate),
        Err(_) => quote!(::calmform),
    }
}

fn to_pascal_case(input: &str) -> String {
    let mut out = String::new();
    for segment in input.split('_') {
        if segment.is_empty() {
            continue;
        }
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn expands_one_lens_per_field() {
        let expanded = expand_form_model(parse_quote! {
            struct Signup {
                user_name: String,
                r#type: u8,
            }
        })
        .expect("named struct expands")
        .to_string();

        assert!(expanded.contains("SignupUserNameLens"));
        assert!(expanded.contains("SignupTypeLens"));
        assert!(expanded.contains("\"user_name\""));
        assert!(expanded.contains("\"type\""));
    }

    #[test]
    fn rejects_fields_that_share_a_lens_name() {
        let error = expand_form_model(parse_quote! {
            struct Signup {
                foo_bar: String,
                foo__bar: String,
            }
        })
        .expect_err("colliding lens names are rejected");

        assert_eq!(
            error.to_string(),
            "field `foo__bar` would generate lens `SignupFooBarLens`, \
             which field `foo_bar` already uses; rename one of them"
        );
    }

    #[test]
    fn rejects_tuple_structs() {
        let error = expand_form_model(parse_quote! {
            struct Pair(String, u8);
        })
        .expect_err("tuple struct is rejected");

        assert_eq!(
            error.to_string(),
            "FormModel derive requires a struct with named fields"
        );
    }

    #[test]
    fn pascal_case_drops_underscores() {
        assert_eq!(to_pascal_case("confirm_password"), "ConfirmPassword");
        assert_eq!(to_pascal_case("_leading"), "Leading");
    }
}
