//! Macros for radix-mux

#![forbid(unsafe_code)]
#![deny(private_in_public, unreachable_pub)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

mod utils;

use proc_macro2::TokenStream;
use quote::quote;
use syn::{AttributeArgs, Error, FnArg, ItemFn, Meta, NestedMeta, Result};

/// Wrap a function as an `Endpoint`.
///
/// Every argument is extracted from the request with `FromRequest`, and the
/// return value may be anything implementing `IntoResult`.
#[proc_macro_attribute]
pub fn handler(
    args: proc_macro::TokenStream,
    input: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    let args = syn::parse_macro_input!(args as AttributeArgs);
    match generate_handler(args, input.into()) {
        Ok(stream) => stream.into(),
        Err(err) => err.into_compile_error().into(),
    }
}

fn parse_internal(args: &[NestedMeta]) -> Result<bool> {
    let mut internal = false;
    for arg in args {
        match arg {
            NestedMeta::Meta(Meta::Path(path)) if path.is_ident("internal") => internal = true,
            _ => return Err(Error::new_spanned(arg, "unknown argument")),
        }
    }
    Ok(internal)
}

fn generate_handler(args: AttributeArgs, input: TokenStream) -> Result<TokenStream> {
    let internal = parse_internal(&args)?;
    let crate_name = utils::get_crate_name(internal);
    let item_fn = syn::parse2::<ItemFn>(input)?;
    let vis = &item_fn.vis;
    let ident = &item_fn.sig.ident;
    let call_await = item_fn.sig.asyncness.map(|_| quote!(.await));

    let mut extractors = Vec::new();
    let mut args = Vec::new();
    for (idx, input) in item_fn.sig.inputs.iter().enumerate() {
        match input {
            FnArg::Typed(pat) => {
                let ty = &pat.ty;
                let id = quote::format_ident!("p{}", idx);
                args.push(id.clone());
                extractors.push(quote! {
                    let #id = <#ty as #crate_name::FromRequest>::from_request(&req, &mut body).await?;
                });
            }
            FnArg::Receiver(receiver) => {
                return Err(Error::new_spanned(receiver, "methods are not supported"));
            }
        }
    }

    let expanded = quote! {
        #[allow(non_camel_case_types)]
        #vis struct #ident;

        #[#crate_name::async_trait]
        impl #crate_name::Endpoint for #ident {
            async fn call(
                &self,
                req: #crate_name::Request,
            ) -> #crate_name::Result<#crate_name::Response> {
                let (req, mut body) = req.split();
                #(#extractors)*
                #item_fn
                #crate_name::error::IntoResult::into_result(#ident(#(#args),*)#call_await)
                    .map(#crate_name::IntoResponse::into_response)
            }
        }
    };

    Ok(expanded)
}
