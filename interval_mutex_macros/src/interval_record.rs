use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Expr, ExprArray, Field, Fields, Ident, Lit, LitStr, Path};

/// Struct-level `#[interval(...)]` settings.
#[derive(Default)]
struct StructAttrs {
    collection: Option<String>,
    collision_fields: Vec<String>,
    exclude: Option<Path>,
}

/// Which record role a field plays.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Role {
    Id,
    Start,
    End,
}

impl Role {
    fn default_name(self) -> &'static str {
        match self {
            Role::Id => "id",
            Role::Start => "start",
            Role::End => "end",
        }
    }
}

pub fn derive_interval_record(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let attrs = parse_struct_attrs(input)?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "IntervalRecord derive only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "IntervalRecord derive only supports structs",
            ))
        }
    };

    let rename_all = container_rename_rule(input)?;
    let (id, id_name) = find_role(input, fields, Role::Id, rename_all)?;
    let (start, start_name) = find_role(input, fields, Role::Start, rename_all)?;
    let (end, end_name) = find_role(input, fields, Role::End, rename_all)?;

    let collection = attrs
        .collection
        .unwrap_or_else(|| format!("{}s", to_snake_case(&name.to_string())));

    let collision_fields = &attrs.collision_fields;
    let exclusion = attrs.exclude.as_ref().map(|path| {
        quote! { .excluding(|record: &Self| #path(record)) }
    });

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::interval_mutex::IntervalRecord for #name #ty_generics #where_clause {
            const COLLECTION: &'static str = #collection;
            const ID_FIELD: &'static str = #id_name;
            const START_FIELD: &'static str = #start_name;
            const END_FIELD: &'static str = #end_name;

            fn id(&self) -> ::std::option::Option<&str> {
                self.#id.as_deref()
            }

            fn set_id(&mut self, id: ::std::option::Option<::std::string::String>) {
                self.#id = id;
            }

            fn start(&self) -> ::std::option::Option<
                ::interval_mutex::chrono::DateTime<::interval_mutex::chrono::Utc>,
            > {
                self.#start
            }

            fn end(&self) -> ::std::option::Option<
                ::interval_mutex::chrono::DateTime<::interval_mutex::chrono::Utc>,
            > {
                self.#end
            }

            fn collision_policy() -> ::interval_mutex::CollisionPolicy<Self> {
                let fields: &[&'static str] = &[#(#collision_fields),*];
                ::interval_mutex::CollisionPolicy::new(fields.iter().copied())
                    #exclusion
            }
        }
    })
}

fn parse_struct_attrs(input: &DeriveInput) -> syn::Result<StructAttrs> {
    let mut attrs = StructAttrs::default();

    for attr in &input.attrs {
        if !attr.path().is_ident("interval") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("collection") {
                let value: LitStr = meta.value()?.parse()?;
                attrs.collection = Some(value.value());
                Ok(())
            } else if meta.path.is_ident("collision_fields") {
                let array: ExprArray = meta.value()?.parse()?;
                for elem in array.elems {
                    match elem {
                        Expr::Lit(expr) => match expr.lit {
                            Lit::Str(field) => attrs.collision_fields.push(field.value()),
                            other => {
                                return Err(syn::Error::new_spanned(
                                    other,
                                    "collision field must be a string literal",
                                ))
                            }
                        },
                        other => {
                            return Err(syn::Error::new_spanned(
                                other,
                                "collision field must be a string literal",
                            ))
                        }
                    }
                }
                Ok(())
            } else if meta.path.is_ident("exclude") {
                attrs.exclude = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("expected `collection`, `collision_fields` or `exclude`"))
            }
        })?;
    }

    Ok(attrs)
}

/// The field playing `role`: the one marked `#[interval(<role>)]`, else the
/// one with the conventional name. Returns the field ident and its serialized
/// name.
fn find_role<'a>(
    input: &DeriveInput,
    fields: impl IntoIterator<Item = &'a Field> + Copy,
    role: Role,
    rename_all: Option<RenameRule>,
) -> syn::Result<(Ident, String)> {
    for field in fields {
        if field_role(field)? == Some(role) {
            let ident = field
                .ident
                .clone()
                .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
            let serialized = serialized_field_name(field, &ident, rename_all)?;
            return Ok((ident, serialized));
        }
    }

    for field in fields {
        if let Some(ident) = &field.ident {
            if ident == role.default_name() {
                let serialized = serialized_field_name(field, ident, rename_all)?;
                return Ok((ident.clone(), serialized));
            }
        }
    }

    Err(syn::Error::new_spanned(
        &input.ident,
        format!(
            "IntervalRecord derive: no field marked with #[interval({0})] and no field named `{0}`",
            role.default_name()
        ),
    ))
}

fn field_role(field: &Field) -> syn::Result<Option<Role>> {
    let mut role = None;
    for attr in &field.attrs {
        if !attr.path().is_ident("interval") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                role = Some(Role::Id);
            } else if meta.path.is_ident("start") {
                role = Some(Role::Start);
            } else if meta.path.is_ident("end") {
                role = Some(Role::End);
            } else {
                return Err(meta.error("expected `id`, `start` or `end`"));
            }
            Ok(())
        })?;
    }
    Ok(role)
}

/// Serde's `rename_all` case conventions.
#[derive(Clone, Copy)]
enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    fn parse(name: &LitStr) -> syn::Result<Self> {
        Ok(match name.value().as_str() {
            "lowercase" => RenameRule::Lower,
            "UPPERCASE" => RenameRule::Upper,
            "PascalCase" => RenameRule::Pascal,
            "camelCase" => RenameRule::Camel,
            "snake_case" => RenameRule::Snake,
            "SCREAMING_SNAKE_CASE" => RenameRule::ScreamingSnake,
            "kebab-case" => RenameRule::Kebab,
            "SCREAMING-KEBAB-CASE" => RenameRule::ScreamingKebab,
            _ => return Err(syn::Error::new_spanned(name, "unknown serde rename_all rule")),
        })
    }

    /// Applies the rule to a snake_case field name, as serde does.
    fn apply(self, field: &str) -> String {
        match self {
            RenameRule::Lower | RenameRule::Snake => field.to_string(),
            RenameRule::Upper | RenameRule::ScreamingSnake => field.to_ascii_uppercase(),
            RenameRule::Kebab => field.replace('_', "-"),
            RenameRule::ScreamingKebab => field.replace('_', "-").to_ascii_uppercase(),
            RenameRule::Pascal | RenameRule::Camel => {
                let mut out = String::new();
                let mut capitalize = matches!(self, RenameRule::Pascal);
                for ch in field.chars() {
                    if ch == '_' {
                        capitalize = true;
                    } else if capitalize {
                        out.push(ch.to_ascii_uppercase());
                        capitalize = false;
                    } else {
                        out.push(ch);
                    }
                }
                out
            }
        }
    }
}

/// The name serde serializes `key = ..` or `key(serialize = ..)` under.
fn serialize_name_value(meta: &syn::meta::ParseNestedMeta) -> syn::Result<Option<LitStr>> {
    if meta.input.peek(syn::Token![=]) {
        return Ok(Some(meta.value()?.parse()?));
    }
    let mut serialize = None;
    meta.parse_nested_meta(|inner| {
        let value: LitStr = inner.value()?.parse()?;
        if inner.path.is_ident("serialize") {
            serialize = Some(value);
        }
        Ok(())
    })?;
    Ok(serialize)
}

/// Skips a serde attribute this derive does not interpret.
fn skip_serde_meta(meta: &syn::meta::ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        let _: Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        let _content;
        syn::parenthesized!(_content in meta.input);
    }
    Ok(())
}

/// `#[serde(rename_all = "...")]` on the struct, if any.
fn container_rename_rule(input: &DeriveInput) -> syn::Result<Option<RenameRule>> {
    let mut rule = None;
    for attr in &input.attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                if let Some(name) = serialize_name_value(&meta)? {
                    rule = Some(RenameRule::parse(&name)?);
                }
                Ok(())
            } else {
                skip_serde_meta(&meta)
            }
        })?;
    }
    Ok(rule)
}

/// The field's serialized name: its own `#[serde(rename)]`, else the struct's
/// `rename_all` rule, else the field name.
fn serialized_field_name(
    field: &Field,
    ident: &Ident,
    rename_all: Option<RenameRule>,
) -> syn::Result<String> {
    let mut renamed = None;
    for attr in &field.attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                if let Some(name) = serialize_name_value(&meta)? {
                    renamed = Some(name.value());
                }
                Ok(())
            } else {
                skip_serde_meta(&meta)
            }
        })?;
    }

    let name = ident.to_string();
    let name = name.strip_prefix("r#").unwrap_or(&name);
    Ok(renamed.unwrap_or_else(|| match rename_all {
        Some(rule) => rule.apply(name),
        None => name.to_string(),
    }))
}

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}
