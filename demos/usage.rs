use avl_concordance::{AvlMap, AvlSet};

fn main() {
    let mut map = AvlMap::new();
    map.put(0, "zero");
    map.put(1, "one");
    map.put(2, "two");
    map.put(2, "deux");
    map.put(3, "three");
    map.put(4, "four");
    map.put(5, "five");
    assert_eq!(map.get(&1), Some(&"one"));
    assert_eq!(map.get(&2), Some(&"two"));
    map.remove(&1);
    assert!(map.get(&1).is_none());

    for (k, v) in &map {
        println!("{k} => {v}");
    }

    let mut set = AvlSet::new();
    for x in 0..5 {
        set.add(x);
    }
    assert!(set.contains(&1));
    set.remove(&1);
    assert!(!set.contains(&1));

    match (set.min(), set.max()) {
        (Ok(min), Ok(max)) => println!("min = {min}, max = {max}"),
        _ => println!("empty set"),
    }

    print!("{{ ");
    for x in &set {
        print!("{x}, ");
    }
    println!("}}");
}
