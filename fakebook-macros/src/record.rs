use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{
    Attribute, Data, DeriveInput, Error, Fields, Ident, LitStr, Result, Token, bracketed, meta::ParseNestedMeta,
    parse::Parse, punctuated::Punctuated,
};

pub(crate) struct ParsedRecord {
    name: Ident,
    table: LitStr,
    id_field: Ident,
    columns: Vec<String>,
    unique: Vec<UniqueSpec>,
}

struct UniqueSpec {
    name: String,
    columns: Vec<String>,
    case_insensitive: bool,
    unordered: bool,
    scope: Option<String>,
    active: Vec<String>,
}

impl UniqueSpec {
    fn to_tokens(&self) -> TokenStream2 {
        let name = LitStr::new(&self.name, Span::call_site());
        let columns = self.columns.iter().map(|c| LitStr::new(c, Span::call_site()));
        let mut tokens = quote! {
            ::fakebook::types::UniqueConstraint::new(#name, [#(#columns),*])
        };
        if self.case_insensitive {
            tokens = quote! { #tokens.case_insensitive() };
        }
        if self.unordered {
            tokens = quote! { #tokens.unordered() };
        }
        if let Some(scope) = &self.scope {
            let scope = LitStr::new(scope, Span::call_site());
            let active = self.active.iter().map(|a| LitStr::new(a, Span::call_site()));
            tokens = quote! { #tokens.scoped(#scope, [#(#active),*]) };
        }
        tokens
    }
}

/// What a single field contributes.
struct FieldInfo {
    ident: Ident,
    column: String,
    is_id: bool,
    unique: Option<bool>,
    skipped: bool,
}

fn parse_string_list(meta: &ParseNestedMeta) -> Result<Vec<String>> {
    let content;
    bracketed!(content in meta.input);
    let parsed: Punctuated<LitStr, Token![,]> = content.parse_terminated(<LitStr as Parse>::parse, Token![,])?;
    Ok(parsed.into_iter().map(|lit| lit.value()).collect())
}

fn parse_unique(meta: &ParseNestedMeta, attr: &Attribute) -> Result<UniqueSpec> {
    let mut spec = UniqueSpec {
        name: String::new(),
        columns: Vec::new(),
        case_insensitive: false,
        unordered: false,
        scope: None,
        active: Vec::new(),
    };
    meta.parse_nested_meta(|inner| {
        if inner.path.is_ident("name") {
            let value: LitStr = inner.value()?.parse()?;
            spec.name = value.value();
        } else if inner.path.is_ident("columns") {
            inner.input.parse::<Token![=]>()?;
            spec.columns = parse_string_list(&inner)?;
        } else if inner.path.is_ident("case_insensitive") {
            spec.case_insensitive = true;
        } else if inner.path.is_ident("unordered") {
            spec.unordered = true;
        } else if inner.path.is_ident("scope") {
            let value: LitStr = inner.value()?.parse()?;
            spec.scope = Some(value.value());
        } else if inner.path.is_ident("active") {
            inner.input.parse::<Token![=]>()?;
            spec.active = parse_string_list(&inner)?;
        } else {
            return Err(inner.error("unknown unique option"));
        }
        Ok(())
    })?;

    if spec.name.is_empty() {
        return Err(Error::new_spanned(attr, "unique(...) requires `name = \"...\"`"));
    }
    if spec.columns.is_empty() {
        return Err(Error::new_spanned(attr, "unique(...) requires at least one column"));
    }
    if spec.scope.is_some() && spec.active.is_empty() {
        return Err(Error::new_spanned(attr, "`scope` needs the `active` values it applies to"));
    }
    Ok(spec)
}

fn serde_column(field_ident: &Ident, attrs: &[Attribute]) -> Result<(String, bool)> {
    let mut column = field_ident.to_string();
    let mut skipped = false;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                column = value.value();
            } else if meta.path.is_ident("skip") {
                skipped = true;
            } else if meta.input.peek(Token![=]) {
                let _: syn::Expr = meta.value()?.parse()?;
            } else if meta.input.peek(syn::token::Paren) {
                meta.parse_nested_meta(|nested| {
                    if nested.input.peek(Token![=]) {
                        let _: syn::Expr = nested.value()?.parse()?;
                    }
                    Ok(())
                })?;
            }
            Ok(())
        })?;
    }
    Ok((column, skipped))
}

impl FieldInfo {
    fn from_field(field: &syn::Field) -> Result<Self> {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| Error::new_spanned(field, "Record requires named fields"))?;
        let (column, skipped) = serde_column(&ident, &field.attrs)?;
        let mut is_id = false;
        let mut unique = None;

        for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("record")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("id") {
                    is_id = true;
                } else if meta.path.is_ident("unique") {
                    let mut case_insensitive = false;
                    if meta.input.peek(syn::token::Paren) {
                        meta.parse_nested_meta(|inner| {
                            if inner.path.is_ident("case_insensitive") {
                                case_insensitive = true;
                                Ok(())
                            } else {
                                Err(inner.error("expected `case_insensitive`"))
                            }
                        })?;
                    }
                    unique = Some(case_insensitive);
                } else {
                    return Err(meta.error("unknown field option, expected `id` or `unique`"));
                }
                Ok(())
            })?;
        }

        if skipped && (is_id || unique.is_some()) {
            return Err(Error::new_spanned(field, "a #[serde(skip)] field cannot be the id or unique"));
        }

        Ok(Self {
            ident,
            column,
            is_id,
            unique,
            skipped,
        })
    }
}

impl ParsedRecord {
    pub(crate) fn from_input(input: &DeriveInput) -> Result<Self> {
        if !input.generics.params.is_empty() {
            return Err(Error::new_spanned(&input.generics, "Record cannot be derived for generic types"));
        }

        let mut table: Option<LitStr> = None;
        let mut unique = Vec::new();
        for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("record")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("table") {
                    table = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("unique") {
                    unique.push(parse_unique(&meta, attr)?);
                } else {
                    return Err(meta.error("unknown record option, expected `table` or `unique`"));
                }
                Ok(())
            })?;
        }
        let table = table.ok_or_else(|| Error::new(input.ident.span(), "Record requires #[record(table = \"...\")]"))?;

        let fields = match &input.data {
            Data::Struct(data) => match &data.fields {
                Fields::Named(named) => named.named.iter().map(FieldInfo::from_field).collect::<Result<Vec<_>>>()?,
                _ => return Err(Error::new(input.ident.span(), "Record requires named fields")),
            },
            _ => return Err(Error::new(input.ident.span(), "Record can only be derived for structs")),
        };

        let mut id_field = None;
        for field in fields.iter().filter(|field| field.is_id) {
            if id_field.is_some() {
                return Err(Error::new(field.ident.span(), "Record allows exactly one #[record(id)] field"));
            }
            id_field = Some(field.ident.clone());
        }
        let id_field =
            id_field.ok_or_else(|| Error::new(input.ident.span(), "Record requires a field annotated with #[record(id)]"))?;

        let columns: Vec<String> =
            fields.iter().filter(|field| !field.skipped).map(|field| field.column.clone()).collect();

        // Field-level constraints come first so single-column claims are checked early.
        let mut constraints: Vec<UniqueSpec> = fields
            .iter()
            .filter_map(|field| {
                field.unique.map(|case_insensitive| UniqueSpec {
                    name: format!("{}_{}", table.value(), field.column),
                    columns: vec![field.column.clone()],
                    case_insensitive,
                    unordered: false,
                    scope: None,
                    active: Vec::new(),
                })
            })
            .collect();
        constraints.extend(unique);

        for spec in &constraints {
            for column in spec.columns.iter().chain(spec.scope.iter()) {
                if !columns.contains(column) {
                    return Err(Error::new(
                        input.ident.span(),
                        format!("unique constraint `{}` names unknown column `{column}`", spec.name),
                    ));
                }
            }
        }

        Ok(Self {
            name: input.ident.clone(),
            table,
            id_field,
            columns,
            unique: constraints,
        })
    }

    pub(crate) fn emit(&self) -> TokenStream2 {
        let name = &self.name;
        let name_lit = LitStr::new(&name.to_string(), Span::call_site());
        let table = &self.table;
        let id_ident = &self.id_field;
        let columns = self.columns.iter().map(|c| LitStr::new(c, Span::call_site()));
        let constraints = self.unique.iter().map(UniqueSpec::to_tokens);

        quote! {
            impl ::fakebook::types::Record for #name {
                const TABLE: &'static str = #table;
                const COLUMNS: &'static [&'static str] = &[#(#columns),*];

                fn record_id(&self) -> &str {
                    &self.#id_ident
                }

                fn unique_constraints() -> ::std::vec::Vec<::fakebook::types::UniqueConstraint> {
                    ::std::vec![#(#constraints),*]
                }
            }

            ::fakebook::inventory::submit! {
                ::fakebook::registry::TableRegistration {
                    type_name: #name_lit,
                    table: #table,
                    constraints_fn: <#name as ::fakebook::types::Record>::unique_constraints,
                }
            }
        }
    }
}
