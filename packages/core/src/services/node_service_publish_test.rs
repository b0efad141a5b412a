//! Tests for publish windows through NodeService
//!
//! Publish state is derived from the window on every read, so these tests
//! move the fixed clock instead of touching stored flags.

#[cfg(test)]
mod publish_tests {
    use crate::models::{NodeUpdate, Permalink, PublishRequest};
    use crate::services::test_support::{fixture, params, start};
    use crate::services::{CreateNodeParams, NodeServiceError};
    use chrono::{Duration, TimeZone, Utc};

    #[tokio::test]
    async fn test_publish_request_opens_window_from_now() {
        let fx = fixture();
        let node = fx
            .service
            .create_node(CreateNodeParams {
                publish: PublishRequest::publish(),
                ..params("page", "News", None)
            })
            .await
            .unwrap();

        assert_eq!(node.published_at, Some(start()));
        assert_eq!(
            node.published_to,
            Some(Utc.with_ymd_and_hms(2034, 6, 1, 9, 0, 0).unwrap())
        );
        assert!(fx.service.scheduler().is_published(&node));
    }

    #[tokio::test]
    async fn test_publish_request_keeps_existing_schedule() {
        let fx = fixture();
        let later = start() + Duration::days(3);
        let node = fx
            .service
            .create_node(CreateNodeParams {
                published_at: Some(later),
                publish: PublishRequest::publish(),
                ..params("page", "Launch", None)
            })
            .await
            .unwrap();

        assert_eq!(node.published_at, Some(later));
        let status = fx.service.scheduler().status(&node);
        assert!(status.pending);
        assert!(!status.published);
    }

    #[tokio::test]
    async fn test_hide_wins_over_publish() {
        let fx = fixture();
        let node = fx
            .service
            .create_node(params("page", "Draft", None))
            .await
            .unwrap();

        let both = PublishRequest {
            publish: true,
            hide: true,
        };
        let hidden = fx
            .service
            .update_node(&node.id, NodeUpdate::new(), both)
            .await
            .unwrap();

        assert_eq!(hidden.published_at, None);
        assert!(hidden.published_to.is_some());
        assert!(fx.service.scheduler().is_pending(&hidden));
        assert!(!fx.service.scheduler().is_published(&hidden));
    }

    #[tokio::test]
    async fn test_requests_are_not_stored() {
        let fx = fixture();
        let node = fx
            .service
            .create_node(CreateNodeParams {
                publish: PublishRequest::publish(),
                ..params("page", "Once", None)
            })
            .await
            .unwrap();

        // A later plain save leaves the window alone
        fx.clock.advance(Duration::days(1));
        let saved = fx
            .service
            .update_node(&node.id, NodeUpdate::new().with_title("Once more"), PublishRequest::none())
            .await
            .unwrap();
        assert_eq!(saved.published_at, Some(start()));
        assert_eq!(saved.updated_at, start() + Duration::days(1));
        assert_eq!(saved.created_at, start());
    }

    #[tokio::test]
    async fn test_find_by_permalink_hides_pending_and_expired() {
        let fx = fixture();
        fx.service
            .create_node(CreateNodeParams {
                published_at: Some(start() + Duration::hours(1)),
                published_to: Some(start() + Duration::hours(2)),
                ..params("page", "Sale", None)
            })
            .await
            .unwrap();
        let permalink = Permalink::new(["sale"]);

        let err = fx.service.find_by_permalink(&permalink).await.unwrap_err();
        assert!(matches!(err, NodeServiceError::PermalinkNotFound { .. }));
        assert!(err.is_not_found());

        fx.clock.advance(Duration::minutes(90));
        let live = fx.service.find_by_permalink(&permalink).await.unwrap();
        assert_eq!(live.title, "Sale");

        fx.clock.advance(Duration::hours(1));
        let err = fx.service.find_by_permalink(&permalink).await.unwrap_err();
        assert!(matches!(err, NodeServiceError::PermalinkNotFound { .. }));
    }

    #[tokio::test]
    async fn test_find_by_permalink_unknown() {
        let fx = fixture();
        let err = fx
            .service
            .find_by_permalink(&Permalink::new(["nowhere"]))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_published_nodes_and_children_follow_the_clock() {
        let fx = fixture();
        let home = fx
            .service
            .create_node(CreateNodeParams {
                publish: PublishRequest::publish(),
                ..params("page", "Home", None)
            })
            .await
            .unwrap();
        fx.service
            .create_node(CreateNodeParams {
                publish: PublishRequest::publish(),
                ..params("page", "Live", Some(&home.id))
            })
            .await
            .unwrap();
        fx.service
            .create_node(CreateNodeParams {
                published_at: Some(start() + Duration::days(7)),
                ..params("page", "Upcoming", Some(&home.id))
            })
            .await
            .unwrap();
        fx.service
            .create_node(params("page", "Unscheduled", Some(&home.id)))
            .await
            .unwrap();

        let titles = |nodes: Vec<crate::models::Node>| {
            let mut titles: Vec<String> = nodes.into_iter().map(|n| n.title).collect();
            titles.sort();
            titles
        };

        assert_eq!(
            titles(fx.service.published_nodes().await.unwrap()),
            vec!["Home", "Live"]
        );
        assert_eq!(
            titles(fx.service.published_children(&home.id).await.unwrap()),
            vec!["Live"]
        );

        fx.clock.advance(Duration::days(7));
        assert_eq!(
            titles(fx.service.published_children(&home.id).await.unwrap()),
            vec!["Live", "Upcoming"]
        );
    }
}
