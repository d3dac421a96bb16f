use match_market::clearing::{ApplicationList, Entrant, clear_market, find_blocking_pair};
use match_market::{
    Applicant, LogisticStrategy, Market, SelectivityStrategy, Strategy, UNRANKED,
    generate_opponents, run_trial,
};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::rngs::mock::StepRng;
use rand_chacha::ChaCha20Rng;

const MARKETS: u64 = 60;

fn random_market(rng: &mut SmallRng, universities: usize) -> Market {
    use rand::Rng;
    let qualities = (0..universities).map(|_| rng.gen_range(0.0..=50.0)).collect();
    Market::new(10.0, 1.0, 6.0, qualities).expect("valid market")
}

#[test]
fn cleared_markets_have_no_blocking_pairs() {
    let mut rng = SmallRng::seed_from_u64(0x5EED);
    for round in 0..MARKETS {
        let universities = 10 + usize::try_from(round % 15).expect("fits");
        let market = random_market(&mut rng, universities);
        let entrants = generate_opponents(&market, universities + 3, 10, &LogisticStrategy, &mut rng)
            .expect("valid lists");
        let clearing = clear_market(universities, &entrants);
        assert_eq!(
            find_blocking_pair(&entrants, &clearing.assignment),
            None,
            "unstable clearing in round {round}"
        );
        for (applicant, university) in clearing.assignment.pairs() {
            assert!(entrants[applicant].list.contains(university));
            assert_eq!(clearing.assignment.applicant_at(university), Some(applicant));
        }
    }
}

#[test]
fn matched_universities_hold_their_best_remaining_proposal() {
    let mut rng = SmallRng::seed_from_u64(77);
    let market = random_market(&mut rng, 16);
    let entrants =
        generate_opponents(&market, 24, 10, &SelectivityStrategy, &mut rng).expect("valid lists");
    let clearing = clear_market(16, &entrants);
    for university in 0..16 {
        let Some(holder) = clearing.assignment.applicant_at(university) else {
            continue;
        };
        let held_score = entrants[holder].applicant.combined_score(university);
        for (applicant, entrant) in entrants.iter().enumerate() {
            if applicant == holder || !entrant.list.contains(university) {
                continue;
            }
            let stronger = entrant.applicant.combined_score(university) > held_score;
            if stronger {
                let seat = clearing
                    .assignment
                    .university_of(applicant)
                    .expect("a stronger applicant who was passed over holds a seat");
                assert!(entrant.list.rank(seat) < entrant.list.rank(university));
            }
        }
    }
}

#[test]
fn rank_uses_list_position_with_unbounded_sentinel() {
    let list = ApplicationList::new(&[4, 1, 7], 8).expect("valid list");
    let ranks: Vec<usize> = (0..8).map(|u| list.rank(u)).collect();
    assert_eq!(
        ranks,
        vec![UNRANKED, 1, UNRANKED, UNRANKED, 0, UNRANKED, UNRANKED, 2]
    );
}

#[test]
fn clearing_is_repeatable_for_frozen_inputs() {
    let mut rng = ChaCha20Rng::seed_from_u64(2024);
    let market = Market::new(8.0, 1.0, 8.0, (0..14).map(f64::from).collect()).expect("market");
    let entrants =
        generate_opponents(&market, 14, 10, &LogisticStrategy, &mut rng).expect("valid lists");
    let baseline = clear_market(14, &entrants);
    for _ in 0..10 {
        assert_eq!(clear_market(14, &entrants).assignment, baseline.assignment);
    }
}

#[test]
fn injected_constant_stream_hands_the_focal_applicant_its_first_choice() {
    let market = Market::new(10.0, 1.0, 10.0, (0..12).map(|i| 30.0 - f64::from(i)).collect())
        .expect("market");
    let focal_applicant = Applicant::new(4.0, vec![1.0; 12]);
    let ranked = SelectivityStrategy.rank_universities(&market, &focal_applicant, 10);
    let focal = Entrant::new(
        focal_applicant,
        ApplicationList::new(&ranked, 12).expect("valid list"),
    );
    // Every opponent draws zero aptitude and zero synergy.
    let mut rng = StepRng::new(0, 0);
    let seat = run_trial(&market, &focal, 11, 10, &LogisticStrategy, &mut rng).expect("trial");
    assert_eq!(seat, Some(ranked[0]));
}
