//! Property-based tests for the grounder's algebraic laws.
//!
//! Each property mirrors a unit test already colocated with its
//! implementation (`src/term.rs`, `src/substitution.rs`) but exercises it
//! over generated input rather than a handful of fixed examples.

use aether::literal::{Literal, LiteralCollection, PredLiteral};
use aether::operators::ArithOp;
use aether::substitution::{match_term, Substitution};
use aether::term::{Term, VarId};
use proptest::prelude::*;

fn ground_term() -> impl Strategy<Value = Term> {
    let leaf = prop_oneof![
        any::<i64>().prop_map(Term::Number),
        "[a-z][a-z0-9_]{0,5}".prop_map(Term::SymConst),
        "[a-z][a-z0-9_]{0,5}".prop_map(Term::Str),
    ];
    leaf.prop_recursive(3, 16, 4, |inner| {
        prop::collection::vec(inner, 0..4).prop_map(|args| Term::Functional("f".to_string(), args))
    })
}

fn arith_leaf() -> impl Strategy<Value = Term> {
    (-1000i64..1000).prop_map(Term::Number)
}

fn arith_op() -> impl Strategy<Value = ArithOp> {
    prop_oneof![
        Just(ArithOp::Plus),
        Just(ArithOp::Minus),
        Just(ArithOp::Times),
    ]
}

fn arith_expr() -> impl Strategy<Value = Term> {
    arith_leaf().prop_recursive(4, 64, 2, |inner| {
        (arith_op(), inner.clone(), inner).prop_map(|(op, l, r)| Term::Arith(op, Box::new(l), Box::new(r)))
    })
}

proptest! {
    /// Property #1: `precedes`/`cmp_ground` is a total order over ground
    /// terms — reflexive, antisymmetric, transitive.
    #[test]
    fn total_order_is_reflexive(t in ground_term()) {
        prop_assert!(t.precedes(&t).unwrap());
    }

    #[test]
    fn total_order_is_antisymmetric(a in ground_term(), b in ground_term()) {
        let a_le_b = a.precedes(&b).unwrap();
        let b_le_a = b.precedes(&a).unwrap();
        if a != b {
            prop_assert!(!(a_le_b && b_le_a));
        }
    }

    #[test]
    fn total_order_is_transitive(a in ground_term(), b in ground_term(), c in ground_term()) {
        if a.precedes(&b).unwrap() && b.precedes(&c).unwrap() {
            prop_assert!(a.precedes(&c).unwrap());
        }
    }

    /// Property #2: arithmetic simplification is idempotent.
    #[test]
    fn simplify_is_idempotent(e in arith_expr()) {
        if let Ok(once) = e.simplify() {
            let twice = once.simplify().unwrap();
            prop_assert_eq!(once, twice);
        }
    }

    /// Property #3: substitution composition satisfies the functor law
    /// `apply(compose(t, s), e) == apply(s, apply(t, e))`.
    #[test]
    fn compose_satisfies_functor_law(n1 in 1i64..100, n2 in 1i64..100) {
        let mut t = Substitution::new();
        t.bind(VarId::Named("X".to_string()), Term::Variable("Y".to_string())).unwrap();
        let mut s = Substitution::new();
        s.bind(VarId::Named("Y".to_string()), Term::Number(n1)).unwrap();
        s.bind(VarId::Named("Z".to_string()), Term::Number(n2)).unwrap();

        let e = Term::Functional("p".to_string(), vec![Term::Variable("X".to_string()), Term::Variable("Z".to_string())]);
        let composed = t.compose(&s);

        let lhs = composed.apply(&e);
        let rhs = s.apply(&t.apply(&e));
        prop_assert_eq!(lhs, rhs);
    }

    /// Property #4: a successful match is correct — applying the resulting
    /// substitution to the pattern reproduces the target.
    #[test]
    fn match_correctness(target in ground_term()) {
        let pattern = Term::Variable("X".to_string());
        if let Some(s) = match_term(&pattern, &target) {
            prop_assert_eq!(s.apply(&pattern), target);
        }
    }

    #[test]
    fn ground_pattern_matches_only_identical_target(a in ground_term(), b in ground_term()) {
        match match_term(&a, &b) {
            Some(s) => {
                prop_assert_eq!(a.clone(), b.clone());
                prop_assert_eq!(s.apply(&a), b);
            }
            None => prop_assert_ne!(a, b),
        }
    }

    /// Property #5: `LiteralCollection` equality/hashing is multiset
    /// (order-independent, duplicate-insensitive) equality.
    #[test]
    fn literal_collection_equality_ignores_order(terms in prop::collection::vec(any::<i64>(), 1..6)) {
        let lits: Vec<Literal> = terms.iter().map(|n| Literal::Pred(PredLiteral::new("p", vec![Term::Number(*n)]))).collect();
        let forward = LiteralCollection::new(lits.clone());
        let backward = LiteralCollection::new(lits.into_iter().rev());
        prop_assert_eq!(forward, backward);
    }
}
