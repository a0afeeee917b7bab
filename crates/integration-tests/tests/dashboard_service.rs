use domains::{DomainError, SportType, UserRole};
use integration_tests::{date, hour_booking, monday_morning, time, Harness};
use services::dashboard::{ChartQuery, Earnings, Granularity};

/// Two live bookings (1000 + 500) and one cancelled one at the fixture court.
async fn busy_week(h: &Harness) -> integration_tests::Fixture {
    let fx = h.bookable_court().await;
    let alice = h.sign_up("alice", UserRole::User).await;
    let bob = h.sign_up("bob", UserRole::User).await;
    let bookings = &h.services.bookings;
    bookings.create(&alice, hour_booking(fx.court_id, date(2024, 1, 1), time(10, 0), 2)).await.unwrap();
    bookings.create(&alice, hour_booking(fx.court_id, date(2024, 1, 3), time(18, 0), 1)).await.unwrap();
    let dropped = bookings.create(&bob, hour_booking(fx.court_id, date(2024, 1, 2), time(10, 0), 1)).await.unwrap();
    bookings.cancel(&bob, dropped.id, "injured").await.unwrap();
    fx
}

#[tokio::test]
async fn owner_stats_count_revenue_from_live_bookings_only() {
    let h = Harness::new(monday_morning());
    let fx = busy_week(&h).await;

    let stats = h.services.dashboard.stats(&fx.owner, None).await.unwrap();
    assert_eq!(stats.counts.total, 3);
    assert_eq!(stats.counts.confirmed, 2);
    assert_eq!(stats.counts.cancelled, 1);
    assert_eq!(stats.today, 1);
    assert_eq!(stats.upcoming, 2);
    assert_eq!(stats.commission_percent, 10);
    assert_eq!(stats.earnings, Earnings { revenue: 1_500, commission: 150, net: 1_350 });
}

#[tokio::test]
async fn stats_are_scoped_to_the_callers_venues() {
    let h = Harness::new(monday_morning());
    let fx = busy_week(&h).await;
    let stranger = h.sign_up("owner-2", UserRole::FacilityOwner).await;
    let player = h.sign_up("player", UserRole::User).await;

    let empty = h.services.dashboard.stats(&stranger, None).await.unwrap();
    assert_eq!(empty.counts.total, 0);
    assert_eq!(empty.earnings, Earnings::default());

    // Naming someone else's venue does not widen the scope.
    let sneaky = h.services.dashboard.stats(&stranger, Some(fx.venue_id)).await.unwrap();
    assert_eq!(sneaky.counts.total, 0);

    assert!(matches!(h.services.dashboard.stats(&player, None).await, Err(DomainError::Authorization(_))));

    let everything = h.services.dashboard.stats(&fx.admin, None).await.unwrap();
    assert_eq!(everything.counts.total, 3);
}

#[tokio::test]
async fn charts_cover_the_window_with_zero_filled_buckets() {
    let h = Harness::new(monday_morning());
    let fx = busy_week(&h).await;

    let query = ChartQuery {
        granularity: Some(Granularity::Daily),
        from: Some(date(2024, 1, 1)),
        to: Some(date(2024, 1, 7)),
        venue_id: None,
    };
    let charts = h.services.dashboard.charts(&fx.owner, query).await.unwrap();
    let counts: Vec<u64> = charts.series.iter().map(|b| b.bookings).collect();
    assert_eq!(counts, vec![1, 0, 1, 0, 0, 0, 0]);
    assert_eq!(charts.series[0].earnings.revenue, 1_000);
    assert_eq!(charts.series[0].label, "2024-01-01");

    assert_eq!(charts.peak_hours.len(), 24);
    assert_eq!(charts.peak_hours[10].bookings, 1);
    assert_eq!(charts.peak_hours[18].bookings, 1);
    assert_eq!(charts.by_sport.len(), 1);
    assert_eq!(charts.by_sport[0].sport, SportType::Badminton);
    assert_eq!(charts.by_sport[0].revenue, 1_500);

    // Defaults: the last seven days ending today.
    let default = h.services.dashboard.charts(&fx.owner, ChartQuery::default()).await.unwrap();
    assert_eq!(default.to, date(2024, 1, 1));
    assert_eq!(default.series.len(), 7);

    let weekly = ChartQuery { granularity: Some(Granularity::Weekly), ..ChartQuery::default() };
    let weekly = h.services.dashboard.charts(&fx.owner, weekly).await.unwrap();
    assert_eq!(weekly.series.len(), 8);
    assert_eq!(weekly.series[0].period_start, date(2023, 11, 13));
    // The current week is reported whole, so Wednesday's upcoming booking counts.
    assert_eq!(weekly.to, date(2024, 1, 7));
    assert_eq!(weekly.series.last().unwrap().bookings, 2);
    assert_eq!(weekly.series.last().unwrap().earnings.revenue, 1_500);

    let backwards = ChartQuery { from: Some(date(2024, 2, 1)), to: Some(date(2024, 1, 1)), ..ChartQuery::default() };
    assert!(matches!(h.services.dashboard.charts(&fx.owner, backwards).await, Err(DomainError::Validation(_))));
}

#[tokio::test]
async fn platform_stats_are_admin_only() {
    let h = Harness::new(monday_morning());
    let fx = busy_week(&h).await;

    assert!(matches!(h.services.dashboard.platform(&fx.owner).await, Err(DomainError::Authorization(_))));

    let platform = h.services.dashboard.platform(&fx.admin).await.unwrap();
    assert_eq!(platform.users_by_role["user"], 2);
    assert_eq!(platform.users_by_role["facility_owner"], 1);
    assert_eq!(platform.users_by_role["admin"], 1);
    assert_eq!(platform.venues_by_status["approved"], 1);
    assert_eq!(platform.venues_by_status["rejected"], 0);
    assert_eq!(platform.bookings.earnings.revenue, 1_500);
}
