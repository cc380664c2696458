use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Transform an asynchronous test into a synchronous one, inject dependencies,
/// and ensure that the session directory is removed regardless of how the test terminates.
///
/// Injectable dependencies are `crate::mock::MockBackend`, `crate::session::SessionStore`
/// and `crate::api::ApiClient`. All of them share the same backend and session slot.
///
/// An optional argument (`voter`, `unverified`, `officer` or `admin`) logs the store in
/// as the matching seeded account before the test body runs.
#[proc_macro_attribute]
pub fn client_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract the arguments to inject and reject invalid function signatures.
    let test_args = match check_sig(item_fn.sig.clone()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    // Log in as one of the seeded accounts if needed.
    let maybe_login = match parse_macro_input!(args as Option<Ident>) {
        Some(arg) => {
            let email = match arg.to_string().as_str() {
                "voter" => quote! { crate::mock::MockBackend::VOTER_EMAIL },
                "unverified" => quote! { crate::mock::MockBackend::UNVERIFIED_EMAIL },
                "officer" => quote! { crate::mock::MockBackend::OFFICER_EMAIL },
                "admin" => quote! { crate::mock::MockBackend::ADMIN_EMAIL },
                _ => {
                    return syn::Error::new(
                        arg.span(),
                        "Expected one of `voter`, `unverified`, `officer` or `admin`",
                    )
                    .into_compile_error()
                    .into();
                }
            };
            quote! {
                store
                    .login(#email, crate::mock::MockBackend::PASSWORD)
                    .await
                    .unwrap();
            }
        }
        None => TokenStream2::new(),
    };

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            /// Test setup.
            async fn setup(
                dir: &std::path::Path,
            ) -> (crate::mock::MockBackend, crate::session::SessionStore) {
                log4rs_test_utils::test_logging::init_logging_once_for(
                    ["voting_client"],
                    None,
                    None,
                );
                let backend = crate::mock::MockBackend::seeded();
                let storage = crate::storage::FileStorage::new(dir).unwrap();
                let slot = crate::session::SessionSlot::open(storage).unwrap();
                let store = crate::session::SessionStore::new(
                    crate::api::ApiClient::new(backend.clone(), slot),
                );

                #maybe_login

                (backend, store)
            }

            /// The test itself.
            #item_fn

            // Each test gets its own session directory.
            let dir = tempfile::tempdir().unwrap();
            let runtime = tokio::runtime::Builder::new_current_thread()
                .thread_name("client-test")
                .enable_all()
                .build()
                .unwrap();

            // Run the setup.
            let (backend, store) = runtime.block_on(setup(dir.path()));

            // Run the test, catching any panics.
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                runtime.block_on(#new_name(#(#test_args),*));
            }));

            // Run the cleanup.
            drop(store);
            drop(backend);
            dir.close().unwrap();

            // If the test panicked, re-raise the panic.
            if let Err(cause) = result {
                std::panic::resume_unwind(cause);
            }
        }
    }
    .into()
}

/// Ensure the wrapped test is async, extract parameters to inject, and reject unknown parameters.
fn check_sig(sig: Signature) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let Pat::Ident(_) = &*pat_type.pat {
                if let Type::Path(type_path) = &*pat_type.ty {
                    // Valid as the last path segment for any type is itself.
                    let type_ident = &type_path.path.segments.last().unwrap().ident;
                    if type_ident == "MockBackend" {
                        args.push(quote! { backend.clone() });
                        continue;
                    } else if type_ident == "SessionStore" {
                        args.push(quote! { store.clone() });
                        continue;
                    } else if type_ident == "ApiClient" {
                        args.push(quote! { store.api().clone() });
                        continue;
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `backend: MockBackend`, `store: SessionStore` or `client: ApiClient`",
        ));
    }

    Ok(args)
}
