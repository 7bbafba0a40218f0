//! Proc macros for kubetest
//!
//! Provides the `#[kubetest::test]` attribute for Kubernetes integration tests.

use proc_macro::TokenStream;
use quote::quote;
use syn::{FnArg, ItemFn, Pat, PatType, ReturnType};

/// Attribute macro for Kubernetes integration tests.
///
/// A function taking a parameter named `ctx` gets a `TestContext` with a
/// fresh namespace, already set up, built from the ambient kubeconfig. The
/// node id is `module_path!()::<fn name>` and the test name is the function
/// name.
///
/// # Example
///
/// ```ignore
/// use kubetest::TestContext;
///
/// #[kubetest::test]
/// async fn test_web_comes_up(ctx: TestContext) {
///     kubetest::markers::apply_manifest(&ctx, "manifests/web.yaml", None).await.unwrap();
///     ctx.wait_until_ready(Some(Duration::from_secs(120)), Duration::from_secs(1)).await.unwrap();
/// }
/// ```
///
/// # With Result Return Type
///
/// ```ignore
/// #[kubetest::test]
/// async fn test_with_result(ctx: TestContext) -> kubetest::Result<()> {
///     ctx.apply(deployment.into()).await?;
///     Ok(())
/// }
/// ```
///
/// An `Err` fails the test like a panic does.
///
/// # What it does
///
/// 1. Create the `TestContext` and run `setup()`
/// 2. Run the test body, catching panics
/// 3. On success: tear the context down
/// 4. On failure: print the namespace, keep it, and fail the test
///
/// # Environment Variables
///
/// - `KUBETEST_KEEP_ALL=true` - never tear down, even on success
///
/// A function without `ctx` becomes a plain `#[tokio::test]`.
#[proc_macro_attribute]
pub fn test(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input_fn = syn::parse_macro_input!(item as ItemFn);
    test_impl(&input_fn).into()
}

/// Check if a function has a parameter named "ctx"
fn has_ctx_param(input_fn: &ItemFn) -> bool {
    input_fn.sig.inputs.iter().any(|arg| {
        if let FnArg::Typed(PatType { pat, .. }) = arg {
            if let Pat::Ident(ident) = pat.as_ref() {
                return ident.ident == "ctx";
            }
        }
        false
    })
}

/// Check if a function has an explicit return type (e.g., `-> Result<...>`)
fn has_result_return(input_fn: &ItemFn) -> bool {
    matches!(&input_fn.sig.output, ReturnType::Type(..))
}

/// Inner implementation that works with `proc_macro2` types for testability
fn test_impl(input_fn: &ItemFn) -> proc_macro2::TokenStream {
    let fn_name = &input_fn.sig.ident;
    let fn_block = &input_fn.block;
    let fn_vis = &input_fn.vis;
    let fn_attrs = &input_fn.attrs;

    if !has_ctx_param(input_fn) {
        return quote! {
            #(#fn_attrs)*
            #[tokio::test]
            #fn_vis async fn #fn_name() {
                #fn_block
            }
        };
    }

    let test_body = match &input_fn.sig.output {
        ReturnType::Type(_, ret_ty) if has_result_return(input_fn) => quote! {
            let result: #ret_ty = (async #fn_block).await;
            if let Err(e) = result {
                panic!("test returned an error: {:?}", e);
            }
        },
        _ => quote! {
            (async #fn_block).await;
        },
    };

    quote! {
        #(#fn_attrs)*
        #[tokio::test]
        #fn_vis async fn #fn_name() {
            use ::kubetest::__private::futures::FutureExt as _;

            ::kubetest::telemetry::init_logging();
            let ctx = ::kubetest::TestContext::for_test(
                concat!(module_path!(), "::", stringify!(#fn_name)),
                stringify!(#fn_name),
            );
            if let Err(e) = ctx.setup().await {
                panic!("[kubetest] setup failed for namespace {}: {}", ctx.namespace(), e);
            }

            let outcome = ::std::panic::AssertUnwindSafe(async {
                #test_body
            })
            .catch_unwind()
            .await;

            match outcome {
                Ok(()) => {
                    if ::kubetest::config::keep_all() {
                        eprintln!("[kubetest] KUBETEST_KEEP_ALL set - keeping namespace: {}", ctx.namespace());
                    } else {
                        match ctx.teardown().await {
                            Ok(report) if !report.is_clean() => {
                                eprintln!("[kubetest] Warning: teardown left {} of {} deletions failed", report.failed, report.attempted);
                            }
                            Ok(_) => {}
                            Err(e) => eprintln!("[kubetest] Warning: teardown failed: {}", e),
                        }
                    }
                }
                Err(panic_info) => {
                    eprintln!("[kubetest] Test failed - keeping namespace for debugging: {}", ctx.namespace());
                    ::std::panic::resume_unwind(panic_info);
                }
            }
        }
    }
}
