//! Procedural macros for oxide-front controllers.
//!
//! This crate provides `#[controller]`, which turns an inherent impl block
//! into a routable controller, and `#[derive(ParamEnum)]` for enums bound
//! from request text by variant name.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::parse::ParseStream;
use syn::punctuated::Punctuated;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, FnArg, Ident, ImplItem, ImplItemFn, ItemImpl,
    LitStr, Meta, Pat, Token, Type,
};

const HANDLER_ATTRS: &[&str] = &["handle_path", "request_mapping", "get_mapping", "post_mapping"];

/// Marks an inherent impl block as a controller.
///
/// Methods carrying one of the handler attributes become request handlers:
///
/// - `#[handle_path("/path")]` - any verb
/// - `#[request_mapping(path = "/path", method = [GET, POST])]` - explicit verbs
///   (the path may also be given positionally)
/// - `#[get_mapping("/path")]` - GET only
/// - `#[post_mapping("/path")]` - POST only
///
/// A method may carry several of these as long as their paths agree. An
/// omitted path maps to `/`.
///
/// # Parameter Attributes
///
/// - `#[request_param("name")]` - binds the parameter by an explicit name
///   instead of positionally
///
/// Parameters are `&Request`, `&mut Response`, or any type implementing
/// `FromParam`. The controller type must implement `Default`; a fresh value
/// is created for every invocation.
///
/// # Generated Items
///
/// - An implementation of `oxide_front::Controller`
/// - A catalog entry tagged with the defining module's path, used by
///   package discovery
#[proc_macro_attribute]
pub fn controller(args: TokenStream, input: TokenStream) -> TokenStream {
    let args = TokenStream2::from(args);
    let item = parse_macro_input!(input as ItemImpl);
    controller_impl(args, item)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derives `ParamEnum` and `FromParam` for a fieldless enum.
///
/// Request text matches a variant name exactly first, then ASCII
/// case-insensitively. The first variant is used when the request carries
/// no value.
#[proc_macro_derive(ParamEnum)]
pub fn derive_param_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_param_enum_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

fn controller_impl(args: TokenStream2, mut item: ItemImpl) -> syn::Result<TokenStream2> {
    if !args.is_empty() {
        return Err(syn::Error::new_spanned(args, "#[controller] takes no arguments"));
    }
    if let Some((_, path, _)) = &item.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[controller] must be placed on an inherent impl block",
        ));
    }
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &item.generics,
            "controllers cannot be generic",
        ));
    }

    let self_ty = item.self_ty.clone();
    let type_name = controller_name(&self_ty)?;

    let mut handlers = Vec::new();
    for impl_item in &mut item.items {
        let ImplItem::Fn(method) = impl_item else {
            continue;
        };
        let mappings = take_mappings(&mut method.attrs)?;
        if mappings.is_empty() {
            continue;
        }
        handlers.push(handler_tokens(method, &mappings)?);
    }

    Ok(quote! {
        #item

        impl ::oxide_front::Controller for #self_ty {
            fn describe() -> ::oxide_front::ControllerDescriptor {
                let __controller = ::std::any::type_name::<Self>();
                ::oxide_front::ControllerDescriptor::new(__controller)
                    #(.handler(#handlers))*
            }
        }

        ::oxide_front::__private::inventory::submit! {
            ::oxide_front::ControllerRegistration::new(
                ::core::module_path!(),
                #type_name,
                <#self_ty as ::oxide_front::Controller>::describe,
            )
        }
    })
}

fn controller_name(ty: &Type) -> syn::Result<String> {
    match ty {
        Type::Path(path) if path.qself.is_none() => path
            .path
            .segments
            .last()
            .map(|segment| segment.ident.to_string())
            .ok_or_else(|| syn::Error::new_spanned(ty, "expected a controller type name")),
        _ => Err(syn::Error::new_spanned(
            ty,
            "controller type must be a named struct",
        )),
    }
}

// Handler attributes

#[derive(Default)]
struct MappingArgs {
    path: Option<LitStr>,
    methods: Vec<syn::Path>,
}

impl MappingArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = Self::default();
        while !input.is_empty() {
            if input.peek(LitStr) {
                args.set_path(input.parse()?)?;
            } else {
                let key: Ident = input.parse()?;
                input.parse::<Token![=]>()?;
                if key == "path" || key == "value" {
                    args.set_path(input.parse()?)?;
                } else if key == "method" {
                    if input.peek(syn::token::Bracket) {
                        let content;
                        syn::bracketed!(content in input);
                        let list = Punctuated::<syn::Path, Token![,]>::parse_terminated(&content)?;
                        args.methods.extend(list);
                    } else {
                        args.methods.push(input.parse()?);
                    }
                } else {
                    return Err(syn::Error::new_spanned(
                        key,
                        "expected `path`, `value`, or `method`",
                    ));
                }
            }

            if !input.is_empty() {
                input.parse::<Token![,]>()?;
            }
        }
        Ok(args)
    }

    fn set_path(&mut self, path: LitStr) -> syn::Result<()> {
        if self.path.is_some() {
            return Err(syn::Error::new_spanned(path, "path declared twice"));
        }
        self.path = Some(path);
        Ok(())
    }
}

fn take_mappings(attrs: &mut Vec<Attribute>) -> syn::Result<Vec<TokenStream2>> {
    let (handler_attrs, others): (Vec<Attribute>, Vec<Attribute>) = std::mem::take(attrs)
        .into_iter()
        .partition(|attr| HANDLER_ATTRS.iter().any(|name| attr.path().is_ident(name)));
    *attrs = others;
    handler_attrs.iter().map(parse_mapping).collect()
}

fn parse_mapping(attr: &Attribute) -> syn::Result<TokenStream2> {
    let args = if matches!(attr.meta, Meta::Path(_)) {
        MappingArgs::default()
    } else {
        attr.parse_args_with(MappingArgs::parse)?
    };
    let path = args.path.map(|lit| lit.value()).unwrap_or_default();
    let path = quote!(::std::string::String::from(#path));

    let is = |name: &str| attr.path().is_ident(name);
    if !is("request_mapping") && !args.methods.is_empty() {
        return Err(syn::Error::new_spanned(
            attr,
            "only #[request_mapping] accepts `method`",
        ));
    }

    if is("handle_path") {
        Ok(quote!(::oxide_front::Mapping::HandlePath(#path)))
    } else if is("get_mapping") {
        Ok(quote!(::oxide_front::Mapping::Get(#path)))
    } else if is("post_mapping") {
        Ok(quote!(::oxide_front::Mapping::Post(#path)))
    } else {
        let methods = args
            .methods
            .iter()
            .map(method_tokens)
            .collect::<syn::Result<Vec<_>>>()?;
        Ok(quote! {
            ::oxide_front::Mapping::Request {
                path: #path,
                methods: ::std::vec![#(#methods),*],
            }
        })
    }
}

fn method_tokens(path: &syn::Path) -> syn::Result<TokenStream2> {
    let verb = path
        .segments
        .last()
        .map(|segment| segment.ident.to_string().to_uppercase());
    match verb.as_deref() {
        Some("GET") => Ok(quote!(::oxide_front::Method::Get)),
        Some("POST") => Ok(quote!(::oxide_front::Method::Post)),
        _ => Err(syn::Error::new_spanned(
            path,
            "unsupported HTTP method, expected GET or POST",
        )),
    }
}

// Handler parameters

enum Receiver {
    None,
    Ref,
    RefMut,
    Owned,
}

enum ParamKind {
    Request,
    Response,
    Value(Type),
    Unsupported(String),
}

struct ParamInfo {
    name: String,
    explicit: Option<String>,
    kind: ParamKind,
}

fn take_params(method: &mut ImplItemFn) -> syn::Result<(Receiver, Vec<ParamInfo>)> {
    let mut receiver = Receiver::None;
    let mut params = Vec::new();

    for input in &mut method.sig.inputs {
        match input {
            FnArg::Receiver(recv) => {
                receiver = match (&recv.reference, &recv.mutability) {
                    (None, _) => Receiver::Owned,
                    (Some(_), Some(_)) => Receiver::RefMut,
                    (Some(_), None) => Receiver::Ref,
                };
            }
            FnArg::Typed(pat_type) => {
                let explicit = take_request_param(&mut pat_type.attrs)?;
                let name = match &*pat_type.pat {
                    Pat::Ident(pat) => pat.ident.to_string(),
                    _ => String::new(),
                };
                params.push(ParamInfo {
                    name,
                    explicit,
                    kind: classify(&pat_type.ty),
                });
            }
        }
    }

    Ok((receiver, params))
}

fn take_request_param(attrs: &mut Vec<Attribute>) -> syn::Result<Option<String>> {
    let Some(index) = attrs
        .iter()
        .position(|attr| attr.path().is_ident("request_param"))
    else {
        return Ok(None);
    };
    let attr = attrs.remove(index);
    if matches!(attr.meta, Meta::Path(_)) {
        return Ok(Some(String::new()));
    }

    attr.parse_args_with(|input: ParseStream| {
        if input.peek(LitStr) {
            return Ok(Some(input.parse::<LitStr>()?.value()));
        }
        let key: Ident = input.parse()?;
        if key != "name" && key != "value" {
            return Err(syn::Error::new_spanned(key, "expected `name` or `value`"));
        }
        input.parse::<Token![=]>()?;
        Ok(Some(input.parse::<LitStr>()?.value()))
    })
}

fn classify(ty: &Type) -> ParamKind {
    match ty {
        Type::Reference(reference) => {
            let target = match &*reference.elem {
                Type::Path(path) => path.path.segments.last().map(|s| s.ident.to_string()),
                _ => None,
            };
            match (target.as_deref(), reference.mutability.is_some()) {
                (Some("Request"), false) => ParamKind::Request,
                (Some("Response"), true) => ParamKind::Response,
                _ => ParamKind::Unsupported(quote!(#ty).to_string()),
            }
        }
        Type::ImplTrait(_) | Type::TraitObject(_) | Type::Infer(_) => {
            ParamKind::Unsupported(quote!(#ty).to_string())
        }
        other => ParamKind::Value(other.clone()),
    }
}

fn handler_tokens(method: &mut ImplItemFn, mappings: &[TokenStream2]) -> syn::Result<TokenStream2> {
    if let Some(asyncness) = &method.sig.asyncness {
        return Err(syn::Error::new_spanned(
            asyncness,
            "handlers must be synchronous",
        ));
    }
    if !method.sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &method.sig.generics,
            "handlers cannot be generic",
        ));
    }

    let (receiver, params) = take_params(method)?;
    let ident = &method.sig.ident;
    let name = ident.to_string();

    let specs = params.iter().map(|param| {
        let param_name = &param.name;
        let spec = match &param.kind {
            ParamKind::Request => quote!(::oxide_front::ParamSpec::request(#param_name)),
            ParamKind::Response => quote!(::oxide_front::ParamSpec::response(#param_name)),
            ParamKind::Value(ty) => quote!(::oxide_front::ParamSpec::value::<#ty>(#param_name)),
            ParamKind::Unsupported(type_name) => {
                quote!(::oxide_front::ParamSpec::unsupported(#param_name, #type_name))
            }
        };
        match &param.explicit {
            Some(explicit) => quote!(#spec.named(#explicit)),
            None => spec,
        }
    });

    let mut bindings = Vec::new();
    let mut call_args = Vec::new();
    for (index, param) in params.iter().enumerate() {
        match &param.kind {
            ParamKind::Request => call_args.push(quote!(__request)),
            ParamKind::Response => call_args.push(quote!(&mut *__response)),
            ParamKind::Value(ty) => {
                let var = format_ident!("__arg{}", index);
                bindings.push(quote!(let #var: #ty = __args.take::<#ty>()?;));
                call_args.push(quote!(#var));
            }
            ParamKind::Unsupported(type_name) => {
                let message = format!("unsupported parameter type {type_name}");
                call_args.push(quote!({
                    return ::core::result::Result::Err(::oxide_front::HandlerError::msg(#message));
                }));
            }
        }
    }

    let instance = quote!(<Self as ::core::default::Default>::default());
    let call = match receiver {
        Receiver::None => quote!(Self::#ident(#(#call_args),*)),
        Receiver::Ref => quote!(Self::#ident(&#instance, #(#call_args),*)),
        Receiver::RefMut => quote!(Self::#ident(&mut #instance, #(#call_args),*)),
        Receiver::Owned => quote!(Self::#ident(#instance, #(#call_args),*)),
    };

    Ok(quote! {{
        #[allow(unreachable_code, unused_mut, unused_variables, clippy::needless_question_mark)]
        let __invoke = |__request: &::oxide_front::Request,
                        __response: &mut ::oxide_front::Response,
                        mut __args: ::oxide_front::BoundArgs|
         -> ::core::result::Result<::oxide_front::HandlerResult, ::oxide_front::HandlerError> {
            #(#bindings)*
            ::oxide_front::IntoHandlerResult::into_handler_result(#call)
        };
        ::oxide_front::HandlerDescriptor::new(__controller, #name)
            #(.mapping(#mappings))*
            #(.param(#specs))*
            .invoke(__invoke)
    }})
}

// ParamEnum

fn derive_param_enum_impl(input: DeriveInput) -> syn::Result<TokenStream2> {
    let ident = &input.ident;
    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input,
            "ParamEnum derive only supports enums",
        ));
    };
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "ParamEnum derive does not support generic enums",
        ));
    }
    if let Some(variant) = data
        .variants
        .iter()
        .find(|v| !matches!(v.fields, syn::Fields::Unit))
    {
        return Err(syn::Error::new_spanned(
            variant,
            "ParamEnum derive only supports fieldless variants",
        ));
    }

    let names: Vec<String> = data.variants.iter().map(|v| v.ident.to_string()).collect();
    let arms = data.variants.iter().enumerate().map(|(index, variant)| {
        let variant = &variant.ident;
        quote!(#index => ::core::option::Option::Some(Self::#variant))
    });

    Ok(quote! {
        impl ::oxide_front::ParamEnum for #ident {
            const VARIANTS: &'static [&'static str] = &[#(#names),*];

            fn from_index(index: usize) -> ::core::option::Option<Self> {
                match index {
                    #(#arms,)*
                    _ => ::core::option::Option::None,
                }
            }
        }

        impl ::oxide_front::FromParam for #ident {
            const TYPE: ::oxide_front::ValueType =
                ::oxide_front::ValueType::Enum(<Self as ::oxide_front::ParamEnum>::VARIANTS);

            fn from_value(
                value: ::core::option::Option<::oxide_front::Value>,
            ) -> ::core::result::Result<Self, ::oxide_front::HandlerError> {
                ::oxide_front::enum_from_value(value)
            }
        }
    })
}
