// Gates a group of items behind the same cfg, and documents that requirement
// on docs.rs. Borrowed from https://github.com/hyperium/hyper (MIT license).

macro_rules! cfg_feature {
    (
        #![$meta:meta]
        $($item:item)*
    ) => {
        $(
            #[cfg($meta)]
            #[cfg_attr(docsrs, doc(cfg($meta)))]
            $item
        )*
    }
}
