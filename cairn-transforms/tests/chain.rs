use cairn0::error::OutputError;
use cairn0::property::{PropertyMap, PropertyValue};
use cairn0::resource::{RegisteredState, ResourceHeader, ResourceKind, ResourceOptions, ResourceRef};
use cairn0::transform::{TransformResult, Transformation};
use cairn0::wire::WireValue;
use cairn_transforms::{async_transformation_fn, transformation_fn, TransformationChain};
use futures::future::{self, FutureExt};
use std::sync::{Arc, Mutex};

type Trail = Arc<Mutex<Vec<String>>>;

fn declare(
    kind: ResourceKind,
    name: &str,
    parent: Option<&ResourceRef>,
    transformations: Vec<Arc<dyn Transformation>>,
) -> ResourceRef {
    let mut header = ResourceHeader::new("test:index:Thing", name, kind);
    header.parent = parent.cloned();
    header.options.transformations = transformations;
    ResourceRef::new(header, |_| {
        future::ready(Err::<RegisteredState, _>(OutputError::other("not registered"))).boxed()
    })
}

/// A step that records its label and changes nothing.
fn marker(label: &str, trail: &Trail) -> Arc<dyn Transformation> {
    let label = label.to_owned();
    let trail = Arc::clone(trail);
    transformation_fn(move |_, _, _| {
        trail.lock().unwrap().push(label.clone());
        None
    })
}

// --- Ordering ---

#[tokio::test]
async fn custom_resource_runs_own_then_ancestors_then_stack() {
    let trail = Trail::default();
    let grandparent = declare(
        ResourceKind::Component,
        "g",
        None,
        vec![marker("grandparent", &trail)],
    );
    let parent = declare(
        ResourceKind::Component,
        "p",
        Some(&grandparent),
        vec![marker("parent", &trail)],
    );
    let child = declare(
        ResourceKind::Custom,
        "c",
        Some(&parent),
        vec![marker("own-1", &trail), marker("own-2", &trail)],
    );

    let chain = TransformationChain::for_resource(&child, &[marker("stack", &trail)]);
    assert_eq!(chain.len(), 5);
    chain
        .apply(&child, PropertyMap::new(), ResourceOptions::new())
        .await
        .unwrap();

    assert_eq!(
        *trail.lock().unwrap(),
        vec!["own-1", "own-2", "parent", "grandparent", "stack"]
    );
}

#[tokio::test]
async fn component_skips_its_own_transformations() {
    let trail = Trail::default();
    let parent = declare(ResourceKind::Component, "p", None, vec![marker("parent", &trail)]);
    let component = declare(
        ResourceKind::Component,
        "svc",
        Some(&parent),
        vec![marker("own", &trail)],
    );

    let chain = TransformationChain::for_resource(&component, &[]);
    chain
        .apply(&component, PropertyMap::new(), ResourceOptions::new())
        .await
        .unwrap();

    assert_eq!(*trail.lock().unwrap(), vec!["parent"]);
}

#[tokio::test]
async fn provider_resource_runs_its_own_transformations() {
    let trail = Trail::default();
    let provider = declare(ResourceKind::Provider, "aws", None, vec![marker("own", &trail)]);
    let chain = TransformationChain::for_resource(&provider, &[]);
    chain
        .apply(&provider, PropertyMap::new(), ResourceOptions::new())
        .await
        .unwrap();
    assert_eq!(*trail.lock().unwrap(), vec!["own"]);
}

// --- Replacement ---

#[tokio::test]
async fn replacement_feeds_later_steps() {
    let seen = Arc::new(Mutex::new(None));
    let grow = transformation_fn(|_, args, options| {
        let args = args.clone().with("size", 5_i64);
        Some(TransformResult::new(args, options.clone().with_protect(true)))
    });
    let observe = {
        let seen = Arc::clone(&seen);
        transformation_fn(move |_, args, options| {
            let size = match args.get("size") {
                Some(PropertyValue::Value(WireValue::Number(n))) => Some(*n),
                _ => None,
            };
            *seen.lock().unwrap() = Some((size, options.protect));
            None
        })
    };
    let resource = declare(ResourceKind::Custom, "r", None, vec![grow, observe]);

    let chain = TransformationChain::for_resource(&resource, &[]);
    let (args, options) = chain
        .apply(&resource, PropertyMap::new().with("size", 1_i64), ResourceOptions::new())
        .await
        .unwrap();

    assert_eq!(*seen.lock().unwrap(), Some((Some(5.0), true)));
    assert!(options.protect);
    assert!(matches!(
        args.get("size"),
        Some(PropertyValue::Value(WireValue::Number(n))) if *n == 5.0
    ));
}

#[tokio::test]
async fn empty_chain_passes_pair_through() {
    let resource = declare(ResourceKind::Custom, "r", None, vec![]);
    let chain = TransformationChain::for_resource(&resource, &[]);
    assert!(chain.is_empty());
    let (args, options) = chain
        .apply(
            &resource,
            PropertyMap::new().with("name", "web"),
            ResourceOptions::new().with_ignore_changes("tags"),
        )
        .await
        .unwrap();
    assert_eq!(args.len(), 1);
    assert_eq!(options.ignore_changes, vec!["tags".to_owned()]);
}

// --- Failure ---

#[tokio::test]
async fn failing_step_stops_chain_and_is_attributed() {
    let trail = Trail::default();
    let fail = async_transformation_fn(|_, _, _| {
        Box::pin(async { Err(OutputError::other("bad tag")) })
    });
    let resource = declare(
        ResourceKind::Custom,
        "r",
        None,
        vec![fail, marker("after", &trail)],
    );

    let chain = TransformationChain::for_resource(&resource, &[]);
    let err = chain
        .apply(&resource, PropertyMap::new(), ResourceOptions::new())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        OutputError::Transformation {
            resource: "test:index:Thing::r".into(),
            message: "bad tag".into(),
        }
    );
    assert!(trail.lock().unwrap().is_empty());
}

// --- Async adapter ---

#[tokio::test]
async fn async_step_can_await_before_replacing() {
    let rename = async_transformation_fn(|resource, args, options| {
        Box::pin(async move {
            tokio::task::yield_now().await;
            let args = args.clone().with("label", resource.name().to_owned());
            Ok(Some(TransformResult::new(args, options.clone())))
        })
    });
    let resource = declare(ResourceKind::Custom, "named", None, vec![rename]);
    let chain = TransformationChain::for_resource(&resource, &[]);
    let (args, _) = chain
        .apply(&resource, PropertyMap::new(), ResourceOptions::new())
        .await
        .unwrap();
    assert!(matches!(
        args.get("label"),
        Some(PropertyValue::Value(WireValue::String(s))) if s == "named"
    ));
}

// --- Root stack ---

#[tokio::test]
async fn root_stack_skips_stack_level_transformations() {
    let trail = Trail::default();
    let header = ResourceHeader::new(cairn0::id::STACK_TYPE, "web-dev", ResourceKind::Component);
    let stack = ResourceRef::new(header, |_| {
        future::ready(Err::<RegisteredState, _>(OutputError::other("not registered"))).boxed()
    });

    let chain = TransformationChain::for_resource(&stack, &[marker("stack", &trail)]);
    assert!(chain.is_empty());

    let child = declare(ResourceKind::Component, "svc", Some(&stack), vec![]);
    let chain = TransformationChain::for_resource(&child, &[marker("stack", &trail)]);
    assert_eq!(chain.len(), 1);
}

// --- Parent changes ---

#[tokio::test]
async fn moving_a_resource_to_another_parent_is_rejected() {
    let home = declare(ResourceKind::Component, "home", None, vec![]);
    let elsewhere = declare(ResourceKind::Component, "elsewhere", None, vec![]);
    let leaf = declare(ResourceKind::Custom, "leaf", Some(&home), vec![]);

    let target = elsewhere.clone();
    let reparent = transformation_fn(move |_, args, options| {
        let mut options = options.clone();
        options.parent = Some(target.clone());
        Some(TransformResult::new(args.clone(), options))
    });
    let after = Trail::default();
    let mut chain = TransformationChain::new();
    chain.add(reparent);
    chain.add(marker("after", &after));

    let declared = ResourceOptions::new().with_parent(&home);
    let err = chain
        .apply(&leaf, PropertyMap::new(), declared)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        OutputError::Transformation { ref resource, ref message }
            if resource == "test:index:Thing::leaf" && message.contains("parent")
    ));
    assert!(after.lock().unwrap().is_empty());
}

#[tokio::test]
async fn keeping_the_parent_while_rewriting_options_is_fine() {
    let home = declare(ResourceKind::Component, "home", None, vec![]);
    let leaf = declare(ResourceKind::Custom, "leaf", Some(&home), vec![]);
    let protect = transformation_fn(|_, args, options| {
        Some(TransformResult::new(args.clone(), options.clone().with_protect(true)))
    });
    let mut chain = TransformationChain::new();
    chain.add(protect);

    let (_, options) = chain
        .apply(&leaf, PropertyMap::new(), ResourceOptions::new().with_parent(&home))
        .await
        .unwrap();
    assert!(options.protect);
    assert_eq!(options.parent, Some(home));
}
