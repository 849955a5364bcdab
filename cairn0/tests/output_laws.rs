//! Property tests for the Output metadata laws.

use cairn0::*;
use futures::future::{BoxFuture, FutureExt};
use proptest::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn node(name: String) -> ResourceRef {
    ResourceRef::new(
        ResourceHeader::new("test:index:Node", name, ResourceKind::Custom),
        |me| -> BoxFuture<'static, Result<RegisteredState, OutputError>> {
            async move {
                Ok(RegisteredState {
                    urn: Urn::new(format!("urn:cairn:dev::p::test:index:Node::{}", me.name())),
                    id: None,
                    outputs: PropertyBag::new(),
                })
            }
            .boxed()
        },
    )
}

#[derive(Debug, Clone)]
struct Meta {
    value: i64,
    known: bool,
    secret: bool,
    deps: usize,
}

fn meta() -> impl Strategy<Value = Meta> {
    (any::<i64>(), any::<bool>(), any::<bool>(), 0usize..3).prop_map(
        |(value, known, secret, deps)| Meta {
            value,
            known,
            secret,
            deps,
        },
    )
}

fn build(meta: &Meta, tag: &str) -> (Output<i64>, DependencySet) {
    let deps: DependencySet = (0..meta.deps).map(|i| node(format!("{tag}{i}"))).collect();
    let data = OutputData::new(Some(meta.value), meta.known, meta.secret, deps.clone());
    (Output::from_data(async move { Ok(data) }), deps)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn tuple_ands_known_ors_secret_unions_deps(a in meta(), b in meta()) {
        let rt = runtime();
        let data = rt.block_on(async {
            let (oa, da) = build(&a, "a");
            let (ob, db) = build(&b, "b");
            let data = Output::tuple2(&oa, &ob).resolve().await.unwrap();
            (data, da, db)
        });
        let (data, da, db) = data;
        prop_assert_eq!(data.is_known(), a.known && b.known);
        prop_assert_eq!(data.is_secret(), a.secret || b.secret);
        prop_assert_eq!(data.dependencies().clone(), da.union(&db));
        if data.is_known() {
            prop_assert_eq!(data.value().copied(), Some((a.value, b.value)));
        } else {
            prop_assert!(data.value().is_none());
        }
    }

    #[test]
    fn map_preserves_metadata(a in meta()) {
        let rt = runtime();
        let (data, deps) = rt.block_on(async {
            let (oa, da) = build(&a, "m");
            (oa.map(|v| v.wrapping_mul(2)).resolve().await.unwrap(), da)
        });
        prop_assert_eq!(data.is_known(), a.known);
        prop_assert_eq!(data.is_secret(), a.secret);
        prop_assert_eq!(data.dependencies().clone(), deps);
    }

    #[test]
    fn apply_combines_metadata_and_short_circuits_unknown(a in meta(), b in meta()) {
        let rt = runtime();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let (data, da, db) = rt.block_on(async {
            let (oa, da) = build(&a, "x");
            let (ob, db) = build(&b, "y");
            let data = oa
                .apply(move |_| {
                    seen.fetch_add(1, Ordering::SeqCst);
                    ob
                })
                .resolve()
                .await
                .unwrap();
            (data, da, db)
        });

        if a.secret {
            prop_assert!(data.is_secret());
        }
        if a.known {
            prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
            prop_assert_eq!(data.is_known(), b.known);
            prop_assert_eq!(data.is_secret(), a.secret || b.secret);
            prop_assert!(da.union(&db).is_subset(data.dependencies()));
        } else {
            prop_assert_eq!(calls.load(Ordering::SeqCst), 0);
            prop_assert!(!data.is_known());
            prop_assert_eq!(data.dependencies().clone(), da);
        }
    }
}
