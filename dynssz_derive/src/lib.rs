#![recursion_limit = "256"]
//! Provides procedural derive macros for the `Encode` and `Decode` trait
//! pairs of the `dynssz` crate.
//!
//! Each derive generates both the static fast-path implementation
//! (`dynssz::Encode` / `dynssz::Decode`) and the spec-aware dynamic
//! implementation (`dynssz::DynEncode` / `dynssz::DynDecode`), together with
//! the type-description hook the descriptor cache consumes.
//!
//! Supports field attributes, see each derive macro for more information.

use darling::{FromDeriveInput, FromMeta};
use proc_macro::TokenStream;
use quote::quote;
use std::convert::TryInto;
use syn::{parse_macro_input, DataEnum, DataStruct, DeriveInput, Ident, Index};

/// The highest possible union selector value (higher values are reserved for
/// backwards compatible extensions).
const MAX_UNION_SELECTOR: u8 = 127;

#[derive(Debug, FromDeriveInput)]
#[darling(attributes(ssz))]
struct StructOpts {
    #[darling(default)]
    enum_behaviour: Option<String>,
    /// Opt out of the static fast path: the dynamic implementation is used
    /// even when no spec override is in force.
    #[darling(default)]
    dynamic_only: bool,
}

/// Field-level configuration.
#[derive(Debug, Default, FromMeta)]
struct FieldOpts {
    /// Per-dimension static sizes, outermost first, e.g. `"8192,32"`. A `?`
    /// marks a variable-length dimension.
    #[darling(default)]
    static_size: Option<String>,
    /// Per-dimension spec expressions aligned with `static_size`, e.g.
    /// `"SLOTS_PER_HISTORICAL_ROOT,32"`. A `?` keeps the static default.
    #[darling(default)]
    dynamic_size: Option<String>,
}

const ENUM_UNION: &str = "union";
const NO_ENUM_BEHAVIOUR_ERROR: &str = "enums require an \"enum_behaviour\" attribute, \
    e.g., #[ssz(enum_behaviour = \"union\")]";

fn parse_ssz_fields(struct_data: &syn::DataStruct) -> Vec<(&syn::Type, &syn::Ident, FieldOpts)> {
    struct_data
        .fields
        .iter()
        .map(|field| {
            let ty = &field.ty;
            let ident = match &field.ident {
                Some(ref ident) => ident,
                _ => panic!("dynssz_derive only supports named struct fields."),
            };

            let field_opts_candidates = field
                .attrs
                .iter()
                .filter(|attr| attr.path.get_ident().map_or(false, |ident| *ident == "ssz"))
                .collect::<Vec<_>>();

            if field_opts_candidates.len() > 1 {
                panic!("more than one field-level \"ssz\" attribute provided")
            }

            let field_opts = field_opts_candidates
                .first()
                .map(|attr| {
                    let meta = attr.parse_meta().unwrap();
                    FieldOpts::from_meta(&meta).unwrap()
                })
                .unwrap_or_default();

            (ty, ident, field_opts)
        })
        .collect()
}

fn option_tokens(value: &Option<String>) -> proc_macro2::TokenStream {
    match value {
        Some(string) => quote! { Some(#string) },
        None => quote! { None },
    }
}

/// Implements the `dynssz` encoding traits for some `struct` or `enum`.
#[proc_macro_derive(Encode, attributes(ssz))]
pub fn ssz_encode_derive(input: TokenStream) -> TokenStream {
    let item = parse_macro_input!(input as DeriveInput);
    let opts = StructOpts::from_derive_input(&item).unwrap();

    match &item.data {
        syn::Data::Struct(s) => {
            if opts.enum_behaviour.is_some() {
                panic!("enum_behaviour is invalid for structs");
            }
            ssz_encode_derive_struct(&item, s, &opts)
        }
        syn::Data::Enum(s) => match opts.enum_behaviour.as_deref() {
            Some(ENUM_UNION) => ssz_encode_derive_enum_union(&item, s, &opts),
            Some(other) => panic!(
                "{} is an invalid enum_behaviour, use \"{}\"",
                other, ENUM_UNION
            ),
            None => panic!("{}", NO_ENUM_BEHAVIOUR_ERROR),
        },
        _ => panic!("dynssz_derive only supports structs and enums"),
    }
}

/// Derive the encoding traits for a struct as an SSZ container.
///
/// Fields are encoded in the order they are defined.
fn ssz_encode_derive_struct(
    derive_input: &DeriveInput,
    struct_data: &DataStruct,
    opts: &StructOpts,
) -> TokenStream {
    let name = &derive_input.ident;
    let (impl_generics, ty_generics, where_clause) = &derive_input.generics.split_for_impl();

    let field_is_ssz_fixed_len = &mut vec![];
    let field_fixed_len = &mut vec![];
    let field_ssz_bytes_len = &mut vec![];
    let field_encoder_append = &mut vec![];
    let field_idents = &mut vec![];
    let field_names = &mut vec![];
    let field_types = &mut vec![];
    let field_static_tags = &mut vec![];
    let field_dynamic_tags = &mut vec![];
    let field_indices = &mut vec![];

    for (i, (ty, ident, field_opts)) in parse_ssz_fields(struct_data).into_iter().enumerate() {
        field_is_ssz_fixed_len.push(quote! { <#ty as dynssz::Encode>::is_ssz_fixed_len() });
        field_fixed_len.push(quote! { <#ty as dynssz::Encode>::ssz_fixed_len() });
        field_ssz_bytes_len.push(quote! { dynssz::Encode::ssz_bytes_len(&self.#ident) });
        field_encoder_append.push(quote! { encoder.append(&self.#ident) });
        field_idents.push(quote! { #ident });
        field_names.push(ident.to_string());
        field_types.push(ty);
        field_static_tags.push(option_tokens(&field_opts.static_size));
        field_dynamic_tags.push(option_tokens(&field_opts.dynamic_size));
        field_indices.push(Index::from(i));
    }

    let num_fields = field_idents.len();
    let finish_type_def = if opts.dynamic_only {
        quote! { Ok(desc.without_fast_path()) }
    } else {
        quote! { Ok(desc) }
    };

    let output = quote! {
        impl #impl_generics dynssz::Encode for #name #ty_generics #where_clause {
            fn is_ssz_fixed_len() -> bool {
                #(
                    #field_is_ssz_fixed_len &&
                )*
                    true
            }

            fn ssz_fixed_len() -> usize {
                if <Self as dynssz::Encode>::is_ssz_fixed_len() {
                    let mut len: usize = 0;
                    #(
                        len = len
                            .checked_add(#field_fixed_len)
                            .expect("encode ssz_fixed_len length overflow");
                    )*
                    len
                } else {
                    dynssz::BYTES_PER_LENGTH_OFFSET
                }
            }

            fn ssz_bytes_len(&self) -> usize {
                if <Self as dynssz::Encode>::is_ssz_fixed_len() {
                    <Self as dynssz::Encode>::ssz_fixed_len()
                } else {
                    let mut len: usize = 0;
                    #(
                        if #field_is_ssz_fixed_len {
                            len = len
                                .checked_add(#field_fixed_len)
                                .expect("encode ssz_bytes_len length overflow");
                        } else {
                            len = len
                                .checked_add(dynssz::BYTES_PER_LENGTH_OFFSET)
                                .expect("encode ssz_bytes_len length overflow for offset");
                            len = len
                                .checked_add(#field_ssz_bytes_len)
                                .expect("encode ssz_bytes_len length overflow for bytes");
                        }
                    )*

                    len
                }
            }

            fn ssz_append(&self, buf: &mut Vec<u8>) {
                let mut offset: usize = 0;
                #(
                    offset = offset
                        .checked_add(#field_fixed_len)
                        .expect("encode ssz_append offset overflow");
                )*

                let mut encoder = dynssz::SszEncoder::container(buf, offset);

                #(
                    #field_encoder_append;
                )*

                encoder.finalize();
            }
        }

        impl #impl_generics dynssz::DynEncode for #name #ty_generics #where_clause {
            fn ssz_type_def(ssz: &dynssz::DynSsz) -> std::result::Result<dynssz::TypeDescriptor, dynssz::Error> {
                let mut fields = Vec::with_capacity(#num_fields);
                #(
                    fields.push(dynssz::resolve_field(
                        ssz.specs(),
                        ssz.encode_descriptor::<#field_types>()?,
                        #field_names,
                        #field_static_tags,
                        #field_dynamic_tags,
                    )?);
                )*
                let desc = dynssz::TypeDescriptor::container(fields)?;
                #finish_type_def
            }

            fn dyn_ssz_bytes_len(
                &self,
                ssz: &dynssz::DynSsz,
                _hints: &[dynssz::SizeHint],
            ) -> std::result::Result<usize, dynssz::Error> {
                let desc = ssz.encode_descriptor::<Self>()?;
                if let Some(fixed) = desc.static_size {
                    return Ok(fixed);
                }

                let mut len: usize = 0;
                #(
                    {
                        let field = &desc.fields[#field_indices];
                        match field.fixed_len {
                            Some(fixed) => {
                                len = len
                                    .checked_add(fixed)
                                    .ok_or_else(|| dynssz::Error::new(dynssz::ErrorKind::Overflow))?;
                            }
                            None => {
                                let payload = ssz
                                    .item_len(&self.#field_idents, &field.hints)
                                    .map_err(|e| e.with_field(#field_names))?;
                                len = len
                                    .checked_add(dynssz::BYTES_PER_LENGTH_OFFSET)
                                    .and_then(|len| len.checked_add(payload))
                                    .ok_or_else(|| dynssz::Error::new(dynssz::ErrorKind::Overflow))?;
                            }
                        }
                    }
                )*
                Ok(len)
            }

            fn dyn_ssz_append(
                &self,
                ssz: &dynssz::DynSsz,
                _hints: &[dynssz::SizeHint],
                buf: &mut Vec<u8>,
            ) -> std::result::Result<(), dynssz::Error> {
                let desc = ssz.encode_descriptor::<Self>()?;

                let mut offset: usize = 0;
                for field in &desc.fields {
                    offset = offset
                        .checked_add(field.fixed_len.unwrap_or(dynssz::BYTES_PER_LENGTH_OFFSET))
                        .ok_or_else(|| dynssz::Error::new(dynssz::ErrorKind::Overflow))?;
                }

                let mut encoder = dynssz::SszEncoder::container(buf, offset);
                #(
                    {
                        let field = &desc.fields[#field_indices];
                        encoder
                            .try_append_parameterized(field.fixed_len.is_some(), |buf| {
                                ssz.append_item(&self.#field_idents, &field.hints, buf)
                            })
                            .map_err(|e| e.with_field(#field_names))?;
                    }
                )*
                encoder.finalize();
                Ok(())
            }
        }
    };
    output.into()
}

/// Derive the encoding traits for an `enum` following the "union" SSZ spec.
///
/// The union selector is the variant's position: the top-most variant has
/// selector `0`, the next `1` and so on. Each variant must have exactly one
/// unnamed field, except that the first variant may be fieldless, in which
/// case it is declared as the SSZ `Null` variant and encodes as a bare zero
/// selector.
fn ssz_encode_derive_enum_union(
    derive_input: &DeriveInput,
    enum_data: &DataEnum,
    opts: &StructOpts,
) -> TokenStream {
    let name = &derive_input.ident;
    let (impl_generics, ty_generics, where_clause) = &derive_input.generics.split_for_impl();

    let variants = parse_union_variants(name, enum_data);
    let union_selectors = compute_union_selectors(variants.len());

    let append_arms: Vec<_> = variants
        .iter()
        .zip(union_selectors.iter())
        .map(|(variant, selector)| match variant {
            UnionVariant::Null(variant_name) => quote! {
                #name::#variant_name => {
                    buf.push(0u8);
                    Ok(())
                }
            },
            UnionVariant::Value(variant_name, _) => {
                let label = variant_name.to_string();
                quote! {
                    #name::#variant_name(ref inner) => {
                        let union_selector: u8 = #selector;
                        debug_assert!(union_selector <= dynssz::MAX_UNION_SELECTOR);
                        buf.push(union_selector);
                        ssz.append_item(inner, &[], buf)
                            .map_err(|e| e.with_field(#label))
                    }
                }
            }
        })
        .collect();

    let static_append_arms: Vec<_> = variants
        .iter()
        .zip(union_selectors.iter())
        .map(|(variant, selector)| match variant {
            UnionVariant::Null(variant_name) => quote! {
                #name::#variant_name => {
                    buf.push(0u8);
                }
            },
            UnionVariant::Value(variant_name, _) => quote! {
                #name::#variant_name(ref inner) => {
                    let union_selector: u8 = #selector;
                    debug_assert!(union_selector <= dynssz::MAX_UNION_SELECTOR);
                    buf.push(union_selector);
                    dynssz::Encode::ssz_append(inner, buf)
                }
            },
        })
        .collect();

    let len_arms: Vec<_> = variants
        .iter()
        .map(|variant| match variant {
            UnionVariant::Null(variant_name) => quote! {
                #name::#variant_name => Ok(1usize)
            },
            UnionVariant::Value(variant_name, _) => {
                let label = variant_name.to_string();
                quote! {
                    #name::#variant_name(ref inner) => ssz
                        .item_len(inner, &[])
                        .map_err(|e| e.with_field(#label))?
                        .checked_add(1)
                        .ok_or_else(|| dynssz::Error::new(dynssz::ErrorKind::Overflow))
                }
            }
        })
        .collect();

    let static_len_arms: Vec<_> = variants
        .iter()
        .map(|variant| match variant {
            UnionVariant::Null(variant_name) => quote! {
                #name::#variant_name => 1usize
            },
            UnionVariant::Value(variant_name, _) => quote! {
                #name::#variant_name(ref inner) => dynssz::Encode::ssz_bytes_len(inner)
                    .checked_add(1)
                    .expect("encoded length must be less than usize::max_value")
            },
        })
        .collect();

    let variant_defs: Vec<_> = variants
        .iter()
        .map(|variant| match variant {
            UnionVariant::Null(variant_name) => {
                let label = variant_name.to_string();
                quote! {
                    variants.push(dynssz::VariantDescriptor {
                        name: #label,
                        elem: None,
                    });
                }
            }
            UnionVariant::Value(variant_name, ty) => {
                let label = variant_name.to_string();
                quote! {
                    variants.push(dynssz::VariantDescriptor {
                        name: #label,
                        elem: Some(ssz.encode_descriptor::<#ty>()?),
                    });
                }
            }
        })
        .collect();

    let num_variants = variants.len();
    let finish_type_def = if opts.dynamic_only {
        quote! { Ok(desc.without_fast_path()) }
    } else {
        quote! { Ok(desc) }
    };

    let output = quote! {
        impl #impl_generics dynssz::Encode for #name #ty_generics #where_clause {
            fn is_ssz_fixed_len() -> bool {
                false
            }

            fn ssz_bytes_len(&self) -> usize {
                match self {
                    #(
                        #static_len_arms,
                    )*
                }
            }

            fn ssz_append(&self, buf: &mut Vec<u8>) {
                match self {
                    #(
                        #static_append_arms,
                    )*
                }
            }
        }

        impl #impl_generics dynssz::DynEncode for #name #ty_generics #where_clause {
            fn ssz_type_def(ssz: &dynssz::DynSsz) -> std::result::Result<dynssz::TypeDescriptor, dynssz::Error> {
                let mut variants = Vec::with_capacity(#num_variants);
                #(
                    #variant_defs
                )*
                let desc = dynssz::TypeDescriptor::union(variants);
                #finish_type_def
            }

            fn dyn_ssz_bytes_len(
                &self,
                ssz: &dynssz::DynSsz,
                _hints: &[dynssz::SizeHint],
            ) -> std::result::Result<usize, dynssz::Error> {
                match self {
                    #(
                        #len_arms,
                    )*
                }
            }

            fn dyn_ssz_append(
                &self,
                ssz: &dynssz::DynSsz,
                _hints: &[dynssz::SizeHint],
                buf: &mut Vec<u8>,
            ) -> std::result::Result<(), dynssz::Error> {
                match self {
                    #(
                        #append_arms,
                    )*
                }
            }
        }
    };
    output.into()
}

/// Implements the `dynssz` decoding traits for a struct or enum.
#[proc_macro_derive(Decode, attributes(ssz))]
pub fn ssz_decode_derive(input: TokenStream) -> TokenStream {
    let item = parse_macro_input!(input as DeriveInput);
    let opts = StructOpts::from_derive_input(&item).unwrap();

    match &item.data {
        syn::Data::Struct(s) => {
            if opts.enum_behaviour.is_some() {
                panic!("enum_behaviour is invalid for structs");
            }
            ssz_decode_derive_struct(&item, s, &opts)
        }
        syn::Data::Enum(s) => match opts.enum_behaviour.as_deref() {
            Some(ENUM_UNION) => ssz_decode_derive_enum_union(&item, s, &opts),
            Some(other) => panic!(
                "{} is an invalid enum_behaviour, use \"{}\"",
                other, ENUM_UNION
            ),
            None => panic!("{}", NO_ENUM_BEHAVIOUR_ERROR),
        },
        _ => panic!("dynssz_derive only supports structs and enums"),
    }
}

/// Derive the decoding traits for a struct as an SSZ container.
///
/// Fields are decoded in the order they are defined. The generated
/// implementations check that a variable-length container accounts for every
/// supplied byte by comparing against the decoded value's encoded length, so
/// they require the matching `Encode` derive on the same struct.
fn ssz_decode_derive_struct(
    item: &DeriveInput,
    struct_data: &DataStruct,
    opts: &StructOpts,
) -> TokenStream {
    let name = &item.ident;
    let (impl_generics, ty_generics, where_clause) = &item.generics.split_for_impl();

    let mut register_types = vec![];
    let mut field_idents = vec![];
    let mut fixed_decodes = vec![];
    let mut decodes = vec![];
    let mut dyn_fixed_decodes = vec![];
    let mut dyn_decodes = vec![];
    let mut is_fixed_lens = vec![];
    let mut fixed_lens = vec![];
    let mut field_names = vec![];
    let mut field_types = vec![];
    let mut field_static_tags = vec![];
    let mut field_dynamic_tags = vec![];

    for (i, (ty, ident, field_opts)) in parse_ssz_fields(struct_data).into_iter().enumerate() {
        let index = Index::from(i);
        let name_str = ident.to_string();

        field_idents.push(quote! { #ident });
        field_names.push(name_str.clone());
        field_types.push(ty);
        field_static_tags.push(option_tokens(&field_opts.static_size));
        field_dynamic_tags.push(option_tokens(&field_opts.dynamic_size));

        let is_ssz_fixed_len = quote! { <#ty as dynssz::Decode>::is_ssz_fixed_len() };
        let ssz_fixed_len = quote! { <#ty as dynssz::Decode>::ssz_fixed_len() };

        register_types.push(quote! {
            builder.register_type::<#ty>()?;
        });
        decodes.push(quote! {
            let #ident = decoder
                .decode_next()
                .map_err(|e| e.with_field(#name_str))?;
        });
        dyn_decodes.push(quote! {
            let #ident = {
                let field = &desc.fields[#index];
                decoder.decode_next_with(|slice, start| {
                    ssz.decode_item(&field.hints, slice)
                        .map_err(|e| e.with_field(#name_str).at_offset(start))
                })?
            };
        });

        fixed_decodes.push(quote! {
            let #ident = {
                start = end;
                end = end
                    .checked_add(#ssz_fixed_len)
                    .ok_or_else(|| dynssz::Error::new(dynssz::ErrorKind::Overflow))?;
                let slice = bytes.get(start..end).ok_or_else(|| {
                    dynssz::Error::new(dynssz::ErrorKind::SizeMismatch {
                        expected: end,
                        found: bytes.len(),
                    })
                })?;
                <#ty as dynssz::Decode>::from_ssz_bytes(slice)
                    .map_err(|e| e.with_field(#name_str).at_offset(start))?
            };
        });
        dyn_fixed_decodes.push(quote! {
            let #ident = {
                let field = &desc.fields[#index];
                let fixed_len = field.fixed_len.ok_or_else(|| {
                    dynssz::Error::new(dynssz::ErrorKind::UnsupportedType(
                        "variable-length field in fixed container",
                    ))
                })?;
                start = end;
                end = end
                    .checked_add(fixed_len)
                    .ok_or_else(|| dynssz::Error::new(dynssz::ErrorKind::Overflow))?;
                let slice = bytes.get(start..end).ok_or_else(|| {
                    dynssz::Error::new(dynssz::ErrorKind::SizeMismatch {
                        expected: end,
                        found: bytes.len(),
                    })
                })?;
                ssz.decode_item(&field.hints, slice)
                    .map_err(|e| e.with_field(#name_str).at_offset(start))?
            };
        });
        is_fixed_lens.push(is_ssz_fixed_len);
        fixed_lens.push(ssz_fixed_len);
    }

    let num_fields = field_idents.len();
    let field_indices: Vec<Index> = (0..num_fields).map(Index::from).collect();
    let finish_type_def = if opts.dynamic_only {
        quote! { Ok(desc.without_fast_path()) }
    } else {
        quote! { Ok(desc) }
    };

    let output = quote! {
        impl #impl_generics dynssz::Decode for #name #ty_generics #where_clause {
            fn is_ssz_fixed_len() -> bool {
                #(
                    #is_fixed_lens &&
                )*
                    true
            }

            fn ssz_fixed_len() -> usize {
                if <Self as dynssz::Decode>::is_ssz_fixed_len() {
                    let mut len: usize = 0;
                    #(
                        len = len
                            .checked_add(#fixed_lens)
                            .expect("decode ssz_fixed_len overflow");
                    )*
                    len
                } else {
                    dynssz::BYTES_PER_LENGTH_OFFSET
                }
            }

            fn from_ssz_bytes(bytes: &[u8]) -> std::result::Result<Self, dynssz::Error> {
                if <Self as dynssz::Decode>::is_ssz_fixed_len() {
                    if bytes.len() != <Self as dynssz::Decode>::ssz_fixed_len() {
                        return Err(dynssz::Error::new(dynssz::ErrorKind::SizeMismatch {
                            expected: <Self as dynssz::Decode>::ssz_fixed_len(),
                            found: bytes.len(),
                        }));
                    }

                    let mut start: usize = 0;
                    let mut end = start;

                    #(
                        #fixed_decodes
                    )*

                    Ok(Self {
                        #(
                            #field_idents,
                        )*
                    })
                } else {
                    let mut builder = dynssz::SszDecoderBuilder::new(bytes);

                    #(
                        #register_types
                    )*

                    let mut decoder = builder.build()?;

                    #(
                        #decodes
                    )*

                    let value = Self {
                        #(
                            #field_idents,
                        )*
                    };

                    // Variable containers have no up-front expected size;
                    // every supplied byte must be accounted for by the
                    // decoded value.
                    let consumed = dynssz::Encode::ssz_bytes_len(&value);
                    if consumed != bytes.len() {
                        return Err(dynssz::Error::new(dynssz::ErrorKind::ExtraData {
                            len: bytes.len(),
                            expected: consumed,
                        }));
                    }

                    Ok(value)
                }
            }
        }

        impl #impl_generics dynssz::DynDecode for #name #ty_generics #where_clause {
            fn ssz_type_def(ssz: &dynssz::DynSsz) -> std::result::Result<dynssz::TypeDescriptor, dynssz::Error> {
                let mut fields = Vec::with_capacity(#num_fields);
                #(
                    fields.push(dynssz::resolve_field(
                        ssz.specs(),
                        ssz.decode_descriptor::<#field_types>()?,
                        #field_names,
                        #field_static_tags,
                        #field_dynamic_tags,
                    )?);
                )*
                let desc = dynssz::TypeDescriptor::container(fields)?;
                #finish_type_def
            }

            fn dyn_from_ssz_bytes(
                ssz: &dynssz::DynSsz,
                _hints: &[dynssz::SizeHint],
                bytes: &[u8],
            ) -> std::result::Result<Self, dynssz::Error> {
                let desc = ssz.decode_descriptor::<Self>()?;

                if let Some(expected) = desc.static_size {
                    if bytes.len() != expected {
                        return Err(dynssz::Error::new(dynssz::ErrorKind::SizeMismatch {
                            expected,
                            found: bytes.len(),
                        }));
                    }

                    let mut start: usize = 0;
                    let mut end = start;

                    #(
                        #dyn_fixed_decodes
                    )*

                    Ok(Self {
                        #(
                            #field_idents,
                        )*
                    })
                } else {
                    let mut builder = dynssz::SszDecoderBuilder::new(bytes);

                    #(
                        builder.register_parameterized(desc.fields[#field_indices].fixed_len)?;
                    )*

                    let mut decoder = builder.build()?;

                    #(
                        #dyn_decodes
                    )*

                    let value = Self {
                        #(
                            #field_idents,
                        )*
                    };

                    // Variable containers have no up-front expected size;
                    // every supplied byte must be accounted for by the
                    // decoded value.
                    let consumed =
                        dynssz::DynEncode::dyn_ssz_bytes_len(&value, ssz, &[])?;
                    if consumed != bytes.len() {
                        return Err(dynssz::Error::new(dynssz::ErrorKind::ExtraData {
                            len: bytes.len(),
                            expected: consumed,
                        }));
                    }

                    Ok(value)
                }
            }
        }
    };
    output.into()
}

/// Derive the decoding traits for an `enum` following the "union" SSZ spec.
fn ssz_decode_derive_enum_union(
    derive_input: &DeriveInput,
    enum_data: &DataEnum,
    opts: &StructOpts,
) -> TokenStream {
    let name = &derive_input.ident;
    let (impl_generics, ty_generics, where_clause) = &derive_input.generics.split_for_impl();

    let variants = parse_union_variants(name, enum_data);
    let union_selectors = compute_union_selectors(variants.len());

    let decode_arms: Vec<_> = variants
        .iter()
        .zip(union_selectors.iter())
        .map(|(variant, selector)| match variant {
            UnionVariant::Null(variant_name) => quote! {
                #selector => {
                    if body.is_empty() {
                        Ok(#name::#variant_name)
                    } else {
                        Err(dynssz::Error::new(dynssz::ErrorKind::ExtraData {
                            len: bytes.len(),
                            expected: 1,
                        }))
                    }
                }
            },
            UnionVariant::Value(variant_name, ty) => {
                let label = variant_name.to_string();
                quote! {
                    #selector => <#ty as dynssz::Decode>::from_ssz_bytes(body)
                        .map(#name::#variant_name)
                        .map_err(|e| e.with_field(#label).at_offset(1))
                }
            }
        })
        .collect();

    let dyn_decode_arms: Vec<_> = variants
        .iter()
        .zip(union_selectors.iter())
        .map(|(variant, selector)| match variant {
            UnionVariant::Null(variant_name) => quote! {
                #selector => {
                    if body.is_empty() {
                        Ok(#name::#variant_name)
                    } else {
                        Err(dynssz::Error::new(dynssz::ErrorKind::ExtraData {
                            len: bytes.len(),
                            expected: 1,
                        }))
                    }
                }
            },
            UnionVariant::Value(variant_name, ty) => {
                let label = variant_name.to_string();
                quote! {
                    #selector => ssz
                        .decode_item::<#ty>(&[], body)
                        .map(#name::#variant_name)
                        .map_err(|e| e.with_field(#label).at_offset(1))
                }
            }
        })
        .collect();

    let variant_defs: Vec<_> = variants
        .iter()
        .map(|variant| match variant {
            UnionVariant::Null(variant_name) => {
                let label = variant_name.to_string();
                quote! {
                    variants.push(dynssz::VariantDescriptor {
                        name: #label,
                        elem: None,
                    });
                }
            }
            UnionVariant::Value(variant_name, ty) => {
                let label = variant_name.to_string();
                quote! {
                    variants.push(dynssz::VariantDescriptor {
                        name: #label,
                        elem: Some(ssz.decode_descriptor::<#ty>()?),
                    });
                }
            }
        })
        .collect();

    let num_variants = variants.len();
    let finish_type_def = if opts.dynamic_only {
        quote! { Ok(desc.without_fast_path()) }
    } else {
        quote! { Ok(desc) }
    };

    let output = quote! {
        impl #impl_generics dynssz::Decode for #name #ty_generics #where_clause {
            fn is_ssz_fixed_len() -> bool {
                false
            }

            fn from_ssz_bytes(bytes: &[u8]) -> std::result::Result<Self, dynssz::Error> {
                // Sanity check to ensure the definition here does not drift
                // from the one defined in `dynssz`.
                debug_assert_eq!(#MAX_UNION_SELECTOR, dynssz::MAX_UNION_SELECTOR);

                let (selector, body) = dynssz::split_union_bytes(bytes)?;

                match selector.into() {
                    #(
                        #decode_arms,
                    )*
                    other => Err(dynssz::Error::new(dynssz::ErrorKind::InvalidUnionSelector(other))),
                }
            }
        }

        impl #impl_generics dynssz::DynDecode for #name #ty_generics #where_clause {
            fn ssz_type_def(ssz: &dynssz::DynSsz) -> std::result::Result<dynssz::TypeDescriptor, dynssz::Error> {
                let mut variants = Vec::with_capacity(#num_variants);
                #(
                    #variant_defs
                )*
                let desc = dynssz::TypeDescriptor::union(variants);
                #finish_type_def
            }

            fn dyn_from_ssz_bytes(
                ssz: &dynssz::DynSsz,
                _hints: &[dynssz::SizeHint],
                bytes: &[u8],
            ) -> std::result::Result<Self, dynssz::Error> {
                let (selector, body) = dynssz::split_union_bytes(bytes)?;

                match selector.into() {
                    #(
                        #dyn_decode_arms,
                    )*
                    other => Err(dynssz::Error::new(dynssz::ErrorKind::InvalidUnionSelector(other))),
                }
            }
        }
    };
    output.into()
}

enum UnionVariant<'a> {
    /// A fieldless variant, only legal in the first (selector zero) position:
    /// the SSZ `Null` variant.
    Null(&'a Ident),
    /// A single-field variant carrying a value of the given type.
    Value(&'a Ident, &'a syn::Type),
}

fn parse_union_variants<'a>(name: &Ident, enum_data: &'a DataEnum) -> Vec<UnionVariant<'a>> {
    enum_data
        .variants
        .iter()
        .enumerate()
        .map(|(i, variant)| match variant.fields.len() {
            0 if i == 0 => UnionVariant::Null(&variant.ident),
            0 => panic!(
                "{}: only the first union variant may be fieldless",
                name
            ),
            1 => {
                let ty = &variant.fields.iter().next().unwrap().ty;
                UnionVariant::Value(&variant.ident, ty)
            }
            _ => panic!("union variants must have a single field"),
        })
        .collect()
}

fn compute_union_selectors(num_variants: usize) -> Vec<u8> {
    let union_selectors = (0..num_variants)
        .map(|i| {
            i.try_into()
                .expect("union selector exceeds u8::max_value, union has too many variants")
        })
        .collect::<Vec<u8>>();

    let highest_selector = union_selectors
        .last()
        .copied()
        .expect("0-variant union is not permitted");

    assert!(
        highest_selector <= MAX_UNION_SELECTOR,
        "union selector {} exceeds limit of {}, enum has too many variants",
        highest_selector,
        MAX_UNION_SELECTOR
    );

    union_selectors
}
