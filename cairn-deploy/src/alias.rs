//! Turning declared aliases into their wire form.

use cairn0::error::OutputError;
use cairn0::id::Urn;
use cairn0::output::Output;
use cairn0::resource::{AliasParent, AliasSpec, ResolvedAlias};
use futures::future;

/// Resolve every alias, concurrently. The result lines up with `specs`
/// position for position.
///
/// A parent URN that is still unknown (preview) resolves to an empty
/// string.
pub async fn resolve_aliases(specs: &[AliasSpec]) -> Result<Vec<ResolvedAlias>, OutputError> {
    future::try_join_all(specs.iter().map(resolve_alias)).await
}

async fn resolve_alias(spec: &AliasSpec) -> Result<ResolvedAlias, OutputError> {
    match spec {
        AliasSpec::Urn(urn) => Ok(ResolvedAlias {
            urn: urn.to_string(),
            ..ResolvedAlias::default()
        }),
        AliasSpec::NoParent => Ok(ResolvedAlias {
            no_parent: true,
            ..ResolvedAlias::default()
        }),
        AliasSpec::Relative(alias) => {
            let parent_urn = match &alias.parent {
                Some(AliasParent::Urn(urn)) => urn_or_empty(urn).await?,
                Some(AliasParent::Resource(parent)) => urn_or_empty(&parent.urn()).await?,
                None => String::new(),
            };
            Ok(ResolvedAlias {
                type_token: alias.type_token.clone().unwrap_or_default(),
                name: alias.name.clone().unwrap_or_default(),
                stack: alias.stack.clone().unwrap_or_default(),
                project: alias.project.clone().unwrap_or_default(),
                parent_urn,
                ..ResolvedAlias::default()
            })
        }
    }
}

async fn urn_or_empty(urn: &Output<Urn>) -> Result<String, OutputError> {
    Ok(urn
        .resolve()
        .await?
        .into_value()
        .map(|urn| urn.to_string())
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn0::resource::RelativeAlias;
    use std::time::Duration;

    #[tokio::test]
    async fn absolute_and_no_parent_need_no_waiting() {
        let resolved = resolve_aliases(&[
            AliasSpec::Urn(Urn::new("urn:cairn:dev::web::aws:s3:Bucket::old")),
            AliasSpec::NoParent,
        ])
        .await
        .unwrap();
        assert_eq!(resolved[0].urn, "urn:cairn:dev::web::aws:s3:Bucket::old");
        assert!(!resolved[0].no_parent);
        assert!(resolved[1].no_parent);
        assert!(resolved[1].urn.is_empty());
    }

    #[tokio::test]
    async fn relative_alias_awaits_parent_and_keeps_position() {
        let slow_parent = Output::from_future(async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(Urn::new("urn:cairn:dev::web::my:app:Service::svc"))
        });
        let resolved = resolve_aliases(&[
            AliasSpec::Relative(
                RelativeAlias::new()
                    .with_name("old-name")
                    .with_parent_urn(slow_parent),
            ),
            AliasSpec::Relative(RelativeAlias::new().with_project("legacy")),
        ])
        .await
        .unwrap();

        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].name, "old-name");
        assert_eq!(resolved[0].parent_urn, "urn:cairn:dev::web::my:app:Service::svc");
        assert!(resolved[0].type_token.is_empty());
        assert_eq!(resolved[1].project, "legacy");
        assert!(resolved[1].parent_urn.is_empty());
    }

    #[tokio::test]
    async fn unknown_parent_urn_becomes_empty() {
        let resolved = resolve_aliases(&[AliasSpec::Relative(
            RelativeAlias::new().with_parent_urn(Output::unknown()),
        )])
        .await
        .unwrap();
        assert!(resolved[0].parent_urn.is_empty());
    }

    #[tokio::test]
    async fn failed_parent_fails_resolution() {
        let err = resolve_aliases(&[AliasSpec::Relative(
            RelativeAlias::new().with_parent_urn(Output::failed(OutputError::other("gone"))),
        )])
        .await
        .unwrap_err();
        assert_eq!(err, OutputError::Other("gone".into()));
    }

    #[tokio::test]
    async fn resolving_the_same_specs_twice_gives_the_same_list() {
        let specs = vec![
            AliasSpec::Relative(
                RelativeAlias::new()
                    .with_name("b")
                    .with_parent_urn(Output::from_future(async {
                        tokio::time::sleep(Duration::from_millis(15)).await;
                        Ok(Urn::new("urn:cairn:dev::web::my:app:Service::slow"))
                    })),
            ),
            AliasSpec::Urn(Urn::new("urn:cairn:dev::web::aws:s3:Bucket::a")),
            AliasSpec::Relative(
                RelativeAlias::new()
                    .with_name("c")
                    .with_parent_urn(Output::of(Urn::new(
                        "urn:cairn:dev::web::my:app:Service::fast",
                    ))),
            ),
            AliasSpec::NoParent,
        ];

        let first = resolve_aliases(&specs).await.unwrap();
        let second = resolve_aliases(&specs).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
        assert_eq!(first[0].name, "b");
        assert_eq!(first[0].parent_urn, "urn:cairn:dev::web::my:app:Service::slow");
        assert_eq!(first[1].urn, "urn:cairn:dev::web::aws:s3:Bucket::a");
        assert_eq!(first[2].name, "c");
        assert!(first[3].no_parent);
    }
}
