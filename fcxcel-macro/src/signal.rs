use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

use super::utils::{clog2, get_enum_encode_value, get_enum_width};

pub fn derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();
    let name = &ast.ident;
    match ast.data {
        syn::Data::Struct(syn::DataStruct {
            fields: syn::Fields::Named(syn::FieldsNamed { ref named, .. }), ..
        }) => {
            let fields = named.iter().collect::<Vec<_>>();

            let ty_widths = fields.iter().map(|f| {
                let ty = &f.ty;
                quote! { + <#ty>::WIDTH }
            });

            // fields for `transl`, MSB first.
            let into_fields = fields.iter().map(|f| {
                let name = &f.ident;
                let ty = &f.ty;
                quote! {
                    bits = bits.checked_shl(<#ty>::WIDTH as u32).unwrap_or(0) | self.#name.transl();
                }
            });

            // fields for `from_bits`, LSB first.
            let from_fields = fields.iter().rev().map(|f| {
                let name = &f.ident;
                let ty = &f.ty;
                quote! {
                    let #name = <#ty>::from_bits(bits & mask(<#ty>::WIDTH));
                    bits = bits.checked_shr(<#ty>::WIDTH as u32).unwrap_or(0);
                }
            });

            let field_names = fields.iter().map(|f| {
                let name = &f.ident;
                quote! { #name }
            });

            let expanded = quote! {
                impl #impl_generics Signal for #name #ty_generics #where_clause {
                    const WIDTH: usize = 0 #(#ty_widths)*;

                    #[allow(unused_mut)]
                    fn transl(self) -> u64 {
                        let mut bits = 0u64;
                        #(#into_fields)*
                        bits
                    }

                    #[allow(unused_mut, unused_assignments, unused_variables)]
                    fn from_bits(bits: u64) -> Self {
                        let mut bits = bits;
                        #(#from_fields)*
                        Self { #(#field_names,)* }
                    }
                }
            };

            expanded.into()
        }
        syn::Data::Enum(syn::DataEnum { ref variants, .. }) => {
            let variant_count = variants.iter().count();
            assert!(variant_count > 0, "{name}: Empty enums cannot be derived as fcxcel `Signal`");
            let width = if let Some(width) = get_enum_width(&ast.attrs) {
                width.base10_parse::<usize>().unwrap_or_else(|_| panic!("{name}: Enum width should be usize"))
            } else if variant_count == 1 {
                1
            } else {
                clog2(variant_count)
            };
            assert!(width < 64, "{name}: Enum width should be less than 64");

            let encodings = variants
                .iter()
                .enumerate()
                .map(|(i, f)| {
                    let variant_name = &f.ident;
                    assert!(
                        matches!(f.fields, syn::Fields::Unit),
                        "{name}::{variant_name}: Only Unit Variant is allowed to be derived as fcxcel Signal"
                    );

                    let encode_value = if let Some(encode_value_lit) = get_enum_encode_value(&f.attrs) {
                        encode_value_lit
                            .base10_parse::<u64>()
                            .unwrap_or_else(|_| panic!("encoding value of {name}::{variant_name} should be u64"))
                    } else {
                        i as u64
                    };
                    assert!(
                        encode_value < (1 << width),
                        "{encode_value}(encoding of {name}::{variant_name}) exceeds maximum for {width} bits",
                    );
                    (variant_name, encode_value)
                })
                .collect::<Vec<_>>();

            let mut seen = encodings.iter().map(|(_, value)| *value).collect::<Vec<_>>();
            seen.sort_unstable();
            seen.dedup();
            assert_eq!(seen.len(), variant_count, "{name}: Enum encodings should be distinct");
            assert_eq!(
                variant_count,
                1 << width,
                "{name}: Every {width}-bit encoding should be taken by a variant so that decoding is total"
            );

            let into_variants = encodings.iter().map(|(variant_name, encode_value)| {
                quote! { Self::#variant_name => #encode_value, }
            });

            let (last_name, _) = encodings[variant_count - 1];
            let from_variants = encodings[..variant_count - 1].iter().map(|(variant_name, encode_value)| {
                quote! { #encode_value => Self::#variant_name, }
            });

            let expanded = quote! {
                impl #impl_generics Signal for #name #ty_generics #where_clause {
                    const WIDTH: usize = #width;

                    fn transl(self) -> u64 {
                        match self {
                            #(#into_variants)*
                        }
                    }

                    fn from_bits(bits: u64) -> Self {
                        match bits & mask(#width) {
                            #(#from_variants)*
                            _ => Self::#last_name,
                        }
                    }
                }
            };

            expanded.into()
        }
        _ => todo!("Signal macro is not implemented for union type"),
    }
}
