// Ember Hardware Wallet firmware and supporting software libraries
//
// Copyright (C) 2025 The Ember Developers
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use proc_macro::TokenStream;

use quote::quote;

use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{parse_macro_input, Ident, ItemFn, LitStr, Token};

#[derive(Debug, Clone, Default)]
struct Attributes {
    label: Option<String>,
    pin: Option<String>,
    uninitialized: bool,
    entropy: Option<String>,
}

struct SingleAttr {
    name: Ident,
    _equal: Token![=],
    value: LitStr,
}

impl Parse for SingleAttr {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        Ok(SingleAttr {
            name: input.parse()?,
            _equal: input.parse()?,
            value: input.parse()?,
        })
    }
}

impl Parse for Attributes {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut attrs = Attributes::default();
        let parsed = Punctuated::<SingleAttr, Token![,]>::parse_terminated(input).unwrap();
        for attr in &parsed {
            match attr.name.to_string().as_str() {
                "label" => attrs.label = Some(attr.value.value()),
                "pin" => attrs.pin = Some(attr.value.value()),
                "uninitialized" => attrs.uninitialized = attr.value.value() == "true",
                "entropy" => attrs.entropy = Some(attr.value.value()),
                x => panic!("Invalid attr {}", x),
            }
        }

        Ok(attrs)
    }
}

#[proc_macro_attribute]
pub fn functional_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attrs = parse_macro_input!(attr as Attributes);

    let mut input = parse_macro_input!(item as ItemFn);
    let original_ident = input.sig.ident.clone();
    let new_ident = Ident::new(&format!("{}_inner", original_ident), original_ident.span());
    input.sig.ident = new_ident.clone();

    let original_ident_str = original_ident.to_string();

    let label = match attrs.label {
        None => quote! { Some("test".to_string()) },
        Some(label) => quote! { Some(#label.to_string()) },
    };
    let pin = match attrs.pin {
        None => quote! { None },
        Some(pin) => quote! { Some(#pin.to_string()) },
    };
    let initialized = !attrs.uninitialized;
    let entropy = match attrs.entropy {
        None => quote! { None },
        Some(v) => quote! {{
            let entropy = #v.parse::<u64>().expect("Valid u64 number");
            Some(entropy)
        }},
    };

    let expanded = quote! {
        #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
        async fn #original_ident() -> Result<(), crate::Error> {
            use tokio::sync::mpsc;

            #input

            crate::tests::INIT_LOG.call_once(|| {
                env_logger::init();
            });

            let (op_sender, op_receiver) = mpsc::channel(16);
            let (res_sender, res_receiver) = mpsc::channel::<Result<(), AssertionResult>>(16);

            let entropy = #entropy;
            let entropy = crate::utils::model::get_entropy(&entropy);

            let setup = crate::utils::DeviceSetup {
                label: #label,
                pin: #pin,
                initialized: #initialized,
                entropy,
            };
            let mut emulator = EmulatorInstance::spawn(setup)?;

            let mut tester = Tester::new(op_sender, res_receiver);
            let _handle = tokio::spawn(async move {
                tester.wait_ticks(4).await.expect("Tester is alive");
                let _ = #new_ident(tester).await;
            });

            let log = run_script(op_receiver, res_sender, &mut emulator).await?;
            if !log.result {
                let temp_dir = crate::tests::get_temp_dir();
                let to = temp_dir.join(concat!(#original_ident_str, ".html"));

                for step in &log.steps {
                    if !step.pass {
                        crate::utils::report::render_report(&to, &log)?;
                        assert!(
                            false,
                            "Test '{}' failed at {:?}. Report available here: {}",
                            #original_ident_str,
                            step.op,
                            to.display()
                        );
                    }
                }
            }

            Ok(())
        }
    };

    TokenStream::from(expanded)
}
