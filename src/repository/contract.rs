use alloy::sol;

// Smart contract ABI definitions for the trade path
sol! {
    /// ERC20 token standard interface.
    ///
    /// Covers the metadata reads, balance/allowance queries and the approval
    /// write used before selling through the edge router.
    #[sol(rpc)]
    interface IERC20 {
        /// Returns the token balance of the specified account.
        function balanceOf(address account) external view returns (uint256);

        /// Returns the remaining amount `spender` may move on behalf of `owner`.
        function allowance(address owner, address spender) external view returns (uint256);

        /// Authorizes `spender` to move up to `amount` of the caller's tokens.
        function approve(address spender, uint256 amount) external returns (bool);

        /// Returns the number of decimals used by the token.
        function decimals() external view returns (uint8);

        /// Returns the token symbol.
        function symbol() external view returns (string memory);

        /// Returns the token name.
        function name() external view returns (string memory);

        /// Returns the total token supply.
        function totalSupply() external view returns (uint256);
    }

    /// Uniswap V2 / PancakeSwap V2 Router02 interface, quoting only.
    #[sol(rpc)]
    interface IUniswapV2Router02 {
        /// Given an input amount and token path, returns the output amount at every hop.
        function getAmountsOut(uint256 amountIn, address[] calldata path) external view returns (uint256[] memory amounts);
    }

    /// Uniswap V3 / PancakeSwap V3 QuoterV2 interface.
    #[sol(rpc)]
    interface IQuoterV2 {
        struct QuoteExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint256 amountIn;
            uint24 fee;
            uint160 sqrtPriceLimitX96;
        }

        /// Simulates a single-hop exact input swap and returns the amount out.
        function quoteExactInputSingle(QuoteExactInputSingleParams calldata params)
            external
            returns (
                uint256 amountOut,
                uint160 sqrtPriceX96After,
                uint32 initializedTicksCrossed,
                uint256 gasEstimate
            );
    }

    /// Edge router.
    ///
    /// Every swap is routed through this contract, which forwards to the venue
    /// router given as the first argument and handles fee-on-transfer tokens.
    #[sol(rpc)]
    interface IEdgeRouter {
        struct ExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint24 fee;
            address recipient;
            uint256 deadline;
            uint256 amountIn;
            uint256 amountOutMinimum;
            uint160 sqrtPriceLimitX96;
        }

        /// Buys tokens with the attached native value through a V2 router.
        function swapExactETHForTokensSupportingFeeOnTransferTokens(
            address router,
            uint256 amountOutMin,
            address[] calldata path,
            address to,
            uint256 deadline
        ) external payable;

        /// Sells `amountIn` tokens for native currency through a V2 router.
        function swapExactTokensForETHSupportingFeeOnTransferTokens(
            address router,
            uint256 amountIn,
            uint256 amountOutMin,
            address[] calldata path,
            address to,
            uint256 deadline
        ) external;

        /// Single-hop exact input swap through a V3 router.
        function exactInputSingle(address router, ExactInputSingleParams calldata params)
            external
            payable
            returns (uint256 amountOut);
    }
}
