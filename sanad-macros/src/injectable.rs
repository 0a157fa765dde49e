use darling::ast::{Data, Style};
use darling::{FromDeriveInput, FromField};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{DeriveInput, GenericArgument, Path, PathArguments, Type, TypePath, parse_quote};

#[derive(FromDeriveInput)]
#[darling(attributes(injectable), supports(struct_any))]
struct InjectableInput {
    ident: syn::Ident,
    generics: syn::Generics,
    data: Data<(), InjectField>,
    #[darling(rename = "crate", default)]
    krate: Option<Path>,
}

#[derive(FromField)]
struct InjectField {
    ident: Option<syn::Ident>,
    ty: Type,
}

/// How a field is satisfied.
enum Shape<'a> {
    Single(&'a Type),
    Collection(&'a Type),
}

pub(crate) fn expand(input: &DeriveInput) -> darling::Result<TokenStream> {
    let parsed = InjectableInput::from_derive_input(input)?;
    let krate = parsed.krate.unwrap_or_else(|| parse_quote!(::sanad));
    let fields = parsed
        .data
        .take_struct()
        .ok_or_else(|| darling::Error::unsupported_shape("enum"))?;

    let mut errors = darling::Error::accumulator();
    let mut params = Vec::with_capacity(fields.len());
    let mut takes = Vec::with_capacity(fields.len());

    for field in &fields.fields {
        let Some(shape) = errors.handle(classify(&field.ty)) else {
            continue;
        };
        let (param, take) = match shape {
            Shape::Single(contract) => (
                quote!(.param::<#contract>()),
                quote!(args.single::<#contract>()?),
            ),
            Shape::Collection(contract) => (
                quote!(.collection::<#contract>()),
                quote!(args.collection::<#contract>()?),
            ),
        };
        params.push(param);
        takes.push(take);
    }
    errors.finish()?;

    let body = match fields.style {
        Style::Struct => {
            let names = fields.fields.iter().filter_map(|f| f.ident.as_ref());
            quote!(Self { #(#names: #takes),* })
        }
        Style::Tuple => quote!(Self(#(#takes),*)),
        Style::Unit => quote!(Self),
    };

    let args = if takes.is_empty() {
        format_ident!("_args")
    } else {
        format_ident!("args")
    };

    let ident = &parsed.ident;
    let (impl_generics, ty_generics, where_clause) = parsed.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics #krate::Injectable for #ident #ty_generics #where_clause {
            fn constructors() -> ::std::vec::Vec<#krate::Constructor<Self>> {
                ::std::vec![
                    #krate::Constructor::new(|#args: &mut #krate::Arguments| {
                        ::core::result::Result::Ok(#body)
                    })
                    #(#params)*
                ]
            }
        }
    })
}

fn classify(ty: &Type) -> darling::Result<Shape<'_>> {
    if let Some(contract) = single_argument(ty, "Arc") {
        return Ok(Shape::Single(contract));
    }

    if let Some(contract) = single_argument(ty, "Vec").and_then(|inner| single_argument(inner, "Arc")) {
        return Ok(Shape::Collection(contract));
    }

    Err(darling::Error::custom(
        "Injectable fields must be `Arc<T>` (one instance) or `Vec<Arc<T>>` (all implementations)",
    )
    .with_span(ty))
}

/// `Name<T>` → `T`, matching on the last path segment only.
fn single_argument<'a>(ty: &'a Type, name: &str) -> Option<&'a Type> {
    let Type::Path(TypePath { qself: None, path }) = ty else {
        return None;
    };
    let segment = path.segments.last()?;
    if segment.ident != name {
        return None;
    }
    let PathArguments::AngleBracketed(arguments) = &segment.arguments else {
        return None;
    };
    match (arguments.args.len(), arguments.args.first()?) {
        (1, GenericArgument::Type(inner)) => Some(inner),
        _ => None,
    }
}
